use std::collections::HashMap;

use super::types::{ContainerSpec, ImageConfig, PortMapping, VolumeKind, VolumeMount};

/// Canonicalize a spec before validation or deploy: environment keys are
/// uppercased and the enumerated string fields get their defaults when
/// the client left them empty. Keys that collide after uppercasing are
/// resolved by sorted original-key order, so repeated calls on the same
/// input agree.
pub fn normalize(mut spec: ContainerSpec) -> ContainerSpec {
    let mut entries: Vec<(String, String)> = spec.environment.into_iter().collect();
    entries.sort();
    let mut environment = HashMap::with_capacity(entries.len());
    for (key, value) in entries {
        environment.insert(key.to_uppercase(), value);
    }
    spec.environment = environment;

    if spec.network_mode.is_empty() {
        spec.network_mode = "bridge".to_string();
    }
    if spec.restart_policy.is_empty() {
        spec.restart_policy = "no".to_string();
    }
    if spec.has_web_ui && spec.web_ui_path.as_deref().unwrap_or("").is_empty() {
        spec.web_ui_path = Some("/".to_string());
    }

    spec
}

/// Fold an inspected image's configuration into a spec as suggestions,
/// never overwriting a field the spec already sets. Each field is added
/// independently so a partially filled form keeps its edits.
pub fn merge(mut spec: ContainerSpec, image: &ImageConfig) -> ContainerSpec {
    if spec.ports.is_empty() {
        spec.ports = image
            .exposed_ports
            .iter()
            .map(|p| PortMapping {
                host_port: p.port,
                container_port: p.port,
                protocol: p.protocol.clone(),
            })
            .collect();
    }

    for var in &image.environment {
        if var.has_value {
            spec.environment
                .entry(var.key.to_uppercase())
                .or_insert_with(|| var.value.clone());
        }
    }

    let mounted: Vec<String> = spec.volumes.iter().map(|v| v.target.clone()).collect();
    for path in &image.volumes {
        if !mounted.contains(path) {
            spec.volumes.push(VolumeMount {
                kind: VolumeKind::Volume,
                source: suggest_volume_name(&spec.image, path),
                target: path.clone(),
                read_only: false,
            });
        }
    }

    if spec.work_dir.is_none() && !image.working_dir.is_empty() {
        spec.work_dir = Some(image.working_dir.clone());
    }
    if spec.user.is_none() && !image.user.is_empty() {
        spec.user = Some(image.user.clone());
    }

    spec
}

/// Derive a stable managed-volume name from the image and mount point,
/// e.g. "redis:7" + "/data" -> "redis-data".
fn suggest_volume_name(image: &str, target: &str) -> String {
    let base = image
        .rsplit('/')
        .next()
        .unwrap_or(image)
        .split(':')
        .next()
        .unwrap_or(image);
    let path = target.trim_matches('/').replace('/', "-");
    if path.is_empty() {
        base.to_string()
    } else {
        format!("{}-{}", base, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lib::spec::types::{ExposedPort, ImageEnvVar};

    #[test]
    fn normalize_uppercases_env_keys() {
        let mut spec = ContainerSpec::default();
        spec.environment
            .insert("tz".to_string(), "UTC".to_string());
        spec.environment
            .insert("Path".to_string(), "/bin".to_string());

        let spec = normalize(spec);
        assert_eq!(spec.environment.get("TZ").map(String::as_str), Some("UTC"));
        assert_eq!(
            spec.environment.get("PATH").map(String::as_str),
            Some("/bin")
        );
        assert!(!spec.environment.contains_key("tz"));
    }

    #[test]
    fn colliding_env_keys_resolve_deterministically() {
        let mut spec = ContainerSpec::default();
        spec.environment
            .insert("TZ".to_string(), "UTC".to_string());
        spec.environment
            .insert("tz".to_string(), "Europe/Berlin".to_string());

        // "TZ" sorts before "tz", so the lowercase entry lands last and
        // wins, on every run.
        let spec = normalize(spec);
        assert_eq!(spec.environment.len(), 1);
        assert_eq!(
            spec.environment.get("TZ").map(String::as_str),
            Some("Europe/Berlin")
        );
    }

    #[test]
    fn normalize_fills_defaults() {
        let mut spec = ContainerSpec::default();
        spec.has_web_ui = true;

        let spec = normalize(spec);
        assert_eq!(spec.network_mode, "bridge");
        assert_eq!(spec.restart_policy, "no");
        assert_eq!(spec.web_ui_path.as_deref(), Some("/"));
    }

    #[test]
    fn normalize_keeps_explicit_values() {
        let mut spec = ContainerSpec::default();
        spec.network_mode = "host".to_string();
        spec.restart_policy = "always".to_string();

        let spec = normalize(spec);
        assert_eq!(spec.network_mode, "host");
        assert_eq!(spec.restart_policy, "always");
    }

    #[test]
    fn merge_does_not_overwrite_existing_fields() {
        let mut spec = ContainerSpec::default();
        spec.image = "redis:7".to_string();
        spec.ports.push(PortMapping {
            host_port: 9000,
            container_port: 6379,
            protocol: "tcp".to_string(),
        });
        spec.environment
            .insert("REDIS_PASSWORD".to_string(), "kept".to_string());

        let image = ImageConfig {
            exposed_ports: vec![ExposedPort {
                port: 6379,
                protocol: "tcp".to_string(),
            }],
            environment: vec![ImageEnvVar {
                key: "REDIS_PASSWORD".to_string(),
                value: "default".to_string(),
                has_value: true,
            }],
            volumes: vec!["/data".to_string()],
            ..Default::default()
        };

        let merged = merge(spec, &image);
        assert_eq!(merged.ports.len(), 1);
        assert_eq!(merged.ports[0].host_port, 9000);
        assert_eq!(
            merged.environment.get("REDIS_PASSWORD").map(String::as_str),
            Some("kept")
        );
        assert_eq!(merged.volumes.len(), 1);
        assert_eq!(merged.volumes[0].source, "redis-data");
        assert_eq!(merged.volumes[0].target, "/data");
    }

    #[test]
    fn merge_suggests_ports_when_spec_has_none() {
        let mut spec = ContainerSpec::default();
        spec.image = "nginx:latest".to_string();

        let image = ImageConfig {
            exposed_ports: vec![ExposedPort {
                port: 80,
                protocol: "tcp".to_string(),
            }],
            ..Default::default()
        };

        let merged = merge(spec, &image);
        assert_eq!(merged.ports.len(), 1);
        assert_eq!(merged.ports[0].container_port, 80);
    }

    #[test]
    fn volume_name_suggestions_are_stable() {
        assert_eq!(suggest_volume_name("redis:7", "/data"), "redis-data");
        assert_eq!(
            suggest_volume_name("ghcr.io/acme/app:v2", "/var/lib/app"),
            "app-var-lib-app"
        );
    }
}
