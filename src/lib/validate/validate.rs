use std::collections::HashSet;
use std::path::Path;

use super::types::{EngineState, ValidationResult};
use crate::lib::spec::types::{ContainerSpec, VolumeKind, NETWORK_MODES, RESTART_POLICIES};

/// Pre-flight checks over a normalized spec plus current engine state.
/// Read-only and idempotent; the UI calls this on every debounced edit.
/// Every violation produces its own entry so the caller can point at
/// each offending field.
pub fn validate(spec: &ContainerSpec, state: &EngineState) -> Vec<ValidationResult> {
    let mut results = Vec::new();

    check_image(spec, &mut results);
    check_ports(spec, state, &mut results);
    check_volumes(spec, &mut results);
    check_resources(spec, &mut results);
    check_privileged(spec, &mut results);
    check_modes(spec, &mut results);

    results
}

fn check_image(spec: &ContainerSpec, results: &mut Vec<ValidationResult>) {
    if spec.image.trim().is_empty() {
        results.push(ValidationResult::error("image", "no image selected"));
    }
}

fn check_ports(spec: &ContainerSpec, state: &EngineState, results: &mut Vec<ValidationResult>) {
    let mut seen: HashSet<(u16, &str)> = HashSet::new();
    for port in &spec.ports {
        if !seen.insert((port.container_port, port.protocol.as_str())) {
            results.push(ValidationResult::error(
                "ports",
                format!(
                    "container port {}/{} is mapped more than once",
                    port.container_port, port.protocol
                ),
            ));
        }
    }

    for port in &spec.ports {
        for bound in &state.port_bindings {
            if bound.host_port == port.host_port && bound.protocol == port.protocol {
                results.push(
                    ValidationResult::error(
                        "ports",
                        format!(
                            "host port {}/{} is already used by container {}",
                            port.host_port, port.protocol, bound.owner
                        ),
                    )
                    .with_details(bound.owner.clone()),
                );
            }
        }
    }
}

fn check_volumes(spec: &ContainerSpec, results: &mut Vec<ValidationResult>) {
    let mut targets: HashSet<&str> = HashSet::new();
    for mount in &spec.volumes {
        if !mount.target.starts_with('/') {
            results.push(ValidationResult::error(
                "volumes",
                format!("mount target {} is not an absolute path", mount.target),
            ));
        }
        if !targets.insert(mount.target.as_str()) {
            results.push(ValidationResult::error(
                "volumes",
                format!("mount target {} is used more than once", mount.target),
            ));
        }
        // The operator may create the directory out-of-band before the
        // deploy runs, so a missing bind source is only a warning.
        if mount.kind == VolumeKind::Bind && !Path::new(&mount.source).exists() {
            results.push(ValidationResult::warning(
                "volumes",
                format!("host path {} does not exist", mount.source),
            ));
        }
    }
}

fn check_resources(spec: &ContainerSpec, results: &mut Vec<ValidationResult>) {
    if spec.cpu_limit.is_some_and(|cpu| cpu < 0.0) {
        results.push(ValidationResult::error(
            "resources",
            "cpu limit must not be negative",
        ));
    }
    if spec.memory_limit.is_some_and(|mem| mem < 0) {
        results.push(ValidationResult::error(
            "resources",
            "memory limit must not be negative",
        ));
    }
}

fn check_privileged(spec: &ContainerSpec, results: &mut Vec<ValidationResult>) {
    if spec.privileged {
        results.push(ValidationResult::warning(
            "privileged",
            "privileged containers have full access to the host",
        ));
    }
}

fn check_modes(spec: &ContainerSpec, results: &mut Vec<ValidationResult>) {
    if !NETWORK_MODES.contains(&spec.network_mode.as_str()) {
        results.push(ValidationResult::error(
            "network",
            format!("unknown network mode {}", spec.network_mode),
        ));
    }
    if !RESTART_POLICIES.contains(&spec.restart_policy.as_str()) {
        results.push(ValidationResult::error(
            "restart_policy",
            format!("unknown restart policy {}", spec.restart_policy),
        ));
    }
}
