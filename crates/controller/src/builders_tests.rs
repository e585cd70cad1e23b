// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn workspace() -> Workspace {
    let mut ws = Workspace::new("default", "foo");
    ws.spec.working_dir = "envs/prod".to_string();
    ws
}

#[test]
fn builtins_config_points_at_state_backend() {
    let config = builtins_config(&workspace());
    assert_eq!(config.meta.name, "workspace-builtins-foo");
    let backend = config.data.get(BACKEND_CONFIG_FILENAME).unwrap();
    assert!(backend.contains("secret_suffix = \"default-foo\""));
    assert!(backend.contains("namespace     = \"default\""));
}

#[test]
fn cache_claim_copies_spec() {
    let mut ws = workspace();
    ws.spec.cache.size = "5Gi".to_string();
    ws.spec.cache.storage_class = Some("fast".to_string());
    let claim = cache_claim(&ws);
    assert_eq!(claim.meta.name, "workspace-foo");
    assert_eq!(claim.spec.size, "5Gi");
    assert_eq!(claim.spec.storage_class.as_deref(), Some("fast"));
}

#[test]
fn workspace_pod_is_owned_and_mounts_infrastructure() {
    let ws = workspace();
    let pod = workspace_pod(&ws, "groundwork/runner:1");

    let owner = pod.meta.controller_owner().unwrap();
    assert_eq!(owner.kind, ResourceKind::Workspace);
    assert_eq!(owner.name, "foo");

    let volume_names: Vec<&str> = pod.spec.volumes.iter().map(|v| v.name.as_str()).collect();
    assert!(volume_names.contains(&"cache"));
    assert!(volume_names.contains(&"builtins"));

    // Init prepares the backend; the idler keeps the pod alive.
    assert_eq!(pod.spec.init_containers.len(), 1);
    let init_args = pod.spec.init_containers[0].args.join(" ");
    assert!(init_args.contains("terraform init"));
    assert!(init_args.contains("terraform workspace select default-foo"));
    assert_eq!(pod.spec.containers[0].name, "idler");
}

#[test]
fn run_pod_assembles_the_command() {
    let ws = workspace();
    let run = Run::new("default", "run-a", "foo", "plan");
    let pod = run_pod(&run, &ws, "groundwork/runner:1");

    let owner = pod.meta.controller_owner().unwrap();
    assert_eq!(owner.kind, ResourceKind::Run);
    assert_eq!(owner.name, "run-a");
    assert_eq!(pod.meta.labels.get("command").map(String::as_str), Some("plan"));

    let container = &pod.spec.containers[0];
    assert_eq!(
        container.args,
        vec!["--", "terraform", "plan"]
    );
    assert_eq!(
        container.working_dir.as_deref(),
        Some("/workspace/envs/prod")
    );
    assert!(container
        .env
        .iter()
        .any(|e| e.name == "TF_WORKSPACE" && e.value == "default-foo"));
}

#[test]
fn run_pod_passes_raw_shell_through() {
    let ws = workspace();
    let mut run = Run::new("default", "run-a", "foo", "sh");
    run.spec.args = vec!["-c".to_string(), "ls".to_string()];
    let pod = run_pod(&run, &ws, "groundwork/runner:1");
    assert_eq!(pod.spec.containers[0].args, vec!["--", "sh", "-c", "ls"]);
}

#[test]
fn credentials_secret_is_mounted_when_configured() {
    let mut ws = workspace();
    ws.spec.secret_name = Some("cloud-creds".to_string());
    let pod = workspace_pod(&ws, "groundwork/runner:1");

    assert!(pod.spec.volumes.iter().any(|v| matches!(
        &v.source,
        VolumeSource::Secret { secret_name } if secret_name == "cloud-creds"
    )));
    assert!(pod.spec.init_containers[0]
        .volume_mounts
        .iter()
        .any(|m| m.mount_path == "/credentials"));
}

#[test]
fn role_grants_state_and_lease_access() {
    let role = role("default");
    assert_eq!(role.meta.name, "groundwork");
    let resources: Vec<&str> = role
        .rules
        .iter()
        .flat_map(|r| r.resources.iter().map(String::as_str))
        .collect();
    assert!(resources.contains(&"secrets"));
    assert!(resources.contains(&"leases"));
    assert!(resources.contains(&"runs"));
}

#[test]
fn role_binding_binds_the_shared_account() {
    let binding = role_binding("default");
    assert_eq!(binding.role, "groundwork");
    assert_eq!(binding.subjects.len(), 1);
    assert_eq!(binding.subjects[0].name, "groundwork");
}

#[test]
fn state_secret_carries_workspace_label() {
    let secret = state_secret(&workspace(), Default::default());
    assert_eq!(secret.meta.name, "state-default-foo");
    assert_eq!(
        secret.meta.labels.get(gw_core::WORKSPACE_LABEL).map(String::as_str),
        Some("foo")
    );
}
