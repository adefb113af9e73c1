// Static checks on a workflow config: image ref, ports, names, paths.

mod error;
mod rules;

pub use error::ValidationError;
pub use rules::{
    Checks, parse_port_mapping, parse_volume_mount, split_image_ref, validate_build_inputs,
    validate_config, validate_container_name, validate_image_ref, validate_mount_source,
};
