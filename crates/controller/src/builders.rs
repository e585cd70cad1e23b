// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Desired-state construction for owned child resources.
//!
//! Everything here is a pure function of the workspace (and run), so every
//! reconcile pass produces the same desired objects.

use gw_core::{
    AttachSpec, ClaimSpec, ConfigMap, Container, EnvVar, ObjectMeta, Pod, PodSpec, PolicyRule,
    ResourceKind, Role, RoleBinding, Run, Secret, ServiceAccount, Subject, Volume, VolumeClaim,
    VolumeMount, VolumeSource, Workspace, ROLE_BINDING_NAME, ROLE_NAME, SERVICE_ACCOUNT_NAME,
    WORKSPACE_LABEL,
};
use std::collections::BTreeMap;

const CACHE_VOLUME: &str = "cache";
const BUILTINS_VOLUME: &str = "builtins";
const CREDENTIALS_VOLUME: &str = "credentials";
const RUNNER_CONTAINER: &str = "runner";
const WORKING_DIR_PARENT: &str = "/workspace";

/// Filename of the generated backend configuration.
pub const BACKEND_CONFIG_FILENAME: &str = "backend.tf";

fn labels(instance: &str, component: &str) -> BTreeMap<String, String> {
    let mut labels = BTreeMap::new();
    labels.insert("app".to_string(), "groundwork".to_string());
    labels.insert("component".to_string(), component.to_string());
    labels.insert("instance".to_string(), instance.to_string());
    labels
}

/// Builtin config for a workspace: backend configuration pointing every
/// pod in the workspace at the same state secret. Generated once; drift is
/// deliberately not reconciled.
pub(crate) fn builtins_config(ws: &Workspace) -> ConfigMap {
    let backend = format!(
        "terraform {{\n  backend \"kubernetes\" {{\n    secret_suffix = \"{}\"\n    namespace     = \"{}\"\n  }}\n}}\n",
        ws.backend_workspace(),
        ws.meta.namespace,
    );

    let mut config = ConfigMap {
        meta: ObjectMeta::new(&ws.meta.namespace, ws.builtins_config_name()),
        data: BTreeMap::new(),
    };
    config.meta.labels = labels(&ws.meta.name, "builtins");
    config.data.insert(BACKEND_CONFIG_FILENAME.to_string(), backend);
    config
}

/// Cache volume claim for a workspace.
pub(crate) fn cache_claim(ws: &Workspace) -> VolumeClaim {
    let mut claim = VolumeClaim {
        meta: ObjectMeta::new(&ws.meta.namespace, ws.claim_name()),
        spec: ClaimSpec {
            storage_class: ws.spec.cache.storage_class.clone(),
            size: ws.spec.cache.size.clone(),
        },
        status: Default::default(),
    };
    claim.meta.labels = labels(&ws.meta.name, "cache");
    claim
}

/// ServiceAccount shared by every run pod in the namespace. Created only
/// if absent and never updated, so externally added annotations (identity
/// federation) survive.
pub(crate) fn service_account(namespace: &str) -> ServiceAccount {
    ServiceAccount {
        meta: ObjectMeta::new(namespace, SERVICE_ACCOUNT_NAME),
    }
}

/// Role granting run pods the API access the tool needs: its state secret,
/// lock leases, and read access to runs.
pub(crate) fn role(namespace: &str) -> Role {
    Role {
        meta: ObjectMeta::new(namespace, ROLE_NAME),
        rules: vec![
            PolicyRule {
                api_groups: vec!["groundwork.dev".to_string()],
                resources: vec!["runs".to_string()],
                verbs: vec!["get".to_string()],
            },
            PolicyRule {
                api_groups: vec![String::new()],
                resources: vec!["secrets".to_string()],
                verbs: vec![
                    "get".to_string(),
                    "list".to_string(),
                    "watch".to_string(),
                    "create".to_string(),
                    "update".to_string(),
                    "delete".to_string(),
                ],
            },
            PolicyRule {
                api_groups: vec!["coordination.k8s.io".to_string()],
                resources: vec!["leases".to_string()],
                verbs: vec![
                    "get".to_string(),
                    "create".to_string(),
                    "update".to_string(),
                    "delete".to_string(),
                ],
            },
            PolicyRule {
                api_groups: vec![String::new()],
                resources: vec!["configmaps".to_string()],
                verbs: vec!["create".to_string()],
            },
        ],
    }
}

pub(crate) fn role_binding(namespace: &str) -> RoleBinding {
    RoleBinding {
        meta: ObjectMeta::new(namespace, ROLE_BINDING_NAME),
        role: ROLE_NAME.to_string(),
        subjects: vec![Subject {
            kind: "ServiceAccount".to_string(),
            name: SERVICE_ACCOUNT_NAME.to_string(),
        }],
    }
}

/// State secret skeleton used when adopting restored payloads.
pub(crate) fn state_secret(ws: &Workspace, data: BTreeMap<String, Vec<u8>>) -> Secret {
    let mut secret = Secret {
        meta: ObjectMeta::new(&ws.meta.namespace, ws.state_secret_name()),
        data,
    };
    secret
        .meta
        .labels
        .insert(WORKSPACE_LABEL.to_string(), ws.meta.name.clone());
    secret
}

fn runner_container(ws: &Workspace, attach: &AttachSpec, working_dir: &str, image: &str) -> Container {
    let mut container = Container {
        name: RUNNER_CONTAINER.to_string(),
        image: image.to_string(),
        command: vec!["gw".to_string(), "runner".to_string()],
        env: vec![
            EnvVar {
                name: "GW_HANDSHAKE".to_string(),
                value: attach.handshake.to_string(),
            },
            EnvVar {
                name: "GW_HANDSHAKE_TIMEOUT".to_string(),
                value: attach.handshake_timeout.clone(),
            },
        ],
        volume_mounts: vec![
            VolumeMount {
                name: BUILTINS_VOLUME.to_string(),
                mount_path: format!("{}/{}", working_dir, BACKEND_CONFIG_FILENAME),
                sub_path: Some(BACKEND_CONFIG_FILENAME.to_string()),
                read_only: true,
            },
            VolumeMount {
                name: CACHE_VOLUME.to_string(),
                mount_path: format!("{}/.terraform", working_dir),
                sub_path: None,
                read_only: false,
            },
        ],
        working_dir: Some(working_dir.to_string()),
        stdin: true,
        tty: true,
        args: Vec::new(),
    };

    if ws.spec.secret_name.is_some() {
        container.volume_mounts.push(VolumeMount {
            name: CREDENTIALS_VOLUME.to_string(),
            mount_path: "/credentials".to_string(),
            sub_path: None,
            read_only: true,
        });
    }

    container
}

fn base_pod(ws: &Workspace, instance: &str, component: &str) -> Pod {
    let mut pod = Pod {
        meta: ObjectMeta::new(&ws.meta.namespace, instance),
        spec: PodSpec {
            service_account: ws.spec.service_account.clone(),
            init_containers: Vec::new(),
            containers: Vec::new(),
            volumes: vec![
                Volume {
                    name: CACHE_VOLUME.to_string(),
                    source: VolumeSource::Claim {
                        claim_name: ws.claim_name(),
                    },
                },
                Volume {
                    name: BUILTINS_VOLUME.to_string(),
                    source: VolumeSource::Config {
                        name: ws.builtins_config_name(),
                    },
                },
            ],
        },
        status: Default::default(),
    };
    pod.meta.labels = labels(instance, component);
    pod.meta
        .labels
        .insert("workspace".to_string(), ws.meta.name.clone());

    if let Some(secret_name) = &ws.spec.secret_name {
        pod.spec.volumes.push(Volume {
            name: CREDENTIALS_VOLUME.to_string(),
            source: VolumeSource::Secret {
                secret_name: secret_name.clone(),
            },
        });
    }

    pod
}

/// Pod initializing a workspace: the init container prepares the backend
/// and selects (or creates) the backend workspace, then an idler keeps the
/// pod alive for inspection.
pub(crate) fn workspace_pod(ws: &Workspace, image: &str) -> Pod {
    let mut pod = base_pod(ws, &ws.pod_name(), "workspace");
    pod.meta
        .set_controller_owner(ResourceKind::Workspace, &ws.meta.name);

    let mut init = runner_container(ws, &ws.spec.attach, WORKING_DIR_PARENT, image);
    init.args = vec![
        "--".to_string(),
        "sh".to_string(),
        "-c".to_string(),
        format!(
            "terraform init -backend-config={}; terraform workspace select {} || terraform workspace new {}",
            BACKEND_CONFIG_FILENAME,
            ws.backend_workspace(),
            ws.backend_workspace(),
        ),
    ];
    pod.spec.init_containers.push(init);

    pod.spec.containers.push(Container {
        name: "idler".to_string(),
        image: image.to_string(),
        command: vec![
            "sh".to_string(),
            "-c".to_string(),
            "trap \"exit 0\" TERM; while true; do sleep 1; done".to_string(),
        ],
        ..Container::default()
    });

    pod
}

/// Pod executing one run's command against its workspace.
pub(crate) fn run_pod(run: &Run, ws: &Workspace, image: &str) -> Pod {
    let mut pod = base_pod(ws, &run.pod_name(), "runner");
    pod.meta
        .set_controller_owner(ResourceKind::Run, &run.meta.name);
    pod.meta
        .labels
        .insert("command".to_string(), run.spec.command.clone());

    let working_dir = if ws.spec.working_dir.is_empty() {
        WORKING_DIR_PARENT.to_string()
    } else {
        format!("{}/{}", WORKING_DIR_PARENT, ws.spec.working_dir)
    };

    let mut container = runner_container(ws, &ws.spec.attach, &working_dir, image);
    container.env.push(EnvVar {
        name: "TF_WORKSPACE".to_string(),
        value: ws.backend_workspace(),
    });

    // Commands run through the tool binary unless they are a raw shell.
    let mut args: Vec<String> = vec!["--".to_string()];
    if run.spec.command != "sh" {
        args.push("terraform".to_string());
    }
    args.push(run.spec.command.clone());
    args.extend(run.spec.args.iter().cloned());
    container.args = args;

    pod.spec.containers.push(container);
    pod
}

#[cfg(test)]
#[path = "builders_tests.rs"]
mod tests;
