//! Job manifest normalization.
//!
//! Every step mutates the manifest in place and is idempotent, so running
//! [`normalize`] on an already-normalized manifest leaves it unchanged.

use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::api::core::v1::{EnvVar, PodSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use std::collections::BTreeMap;

use crate::labels::{GROUP_LABEL, JOB_MARKER, MANAGED_LABEL, POD_MARKER};
use crate::naming::is_label_value;
use crate::{Error, Result};

pub const DEFAULT_NAMESPACE: &str = "default";
pub const TERM_ON_EMPTY: &str = "TERM_ON_EMPTY";
pub const TERM_ON_EMPTY_VALUE: &str = "1";
pub const DEFAULT_RESTART_POLICY: &str = "OnFailure";

/// Apply every normalization step.
pub fn normalize(job: &mut Job) -> &mut Job {
    ensure_namespace(job);
    add_labels(job);
    ensure_term_on_empty(job);
    ensure_restart_policy(job);
    job
}

/// The job's group key: its declared name.
///
/// The name is copied into the group label, so it must also be a valid
/// label value.
pub fn group_name(job: &Job) -> Result<&str> {
    let name = job
        .metadata
        .name
        .as_deref()
        .filter(|n| !n.is_empty())
        .ok_or_else(|| Error::InvalidManifest("metadata.name is required".to_string()))?;

    if !is_label_value(name) {
        return Err(Error::InvalidManifest(format!(
            "metadata.name '{name}' cannot be used as a label value"
        )));
    }
    Ok(name)
}

/// The job's namespace, falling back to [`DEFAULT_NAMESPACE`].
pub fn namespace(job: &Job) -> &str {
    job.metadata
        .namespace
        .as_deref()
        .filter(|ns| !ns.is_empty())
        .unwrap_or(DEFAULT_NAMESPACE)
}

/// Default the namespace. An explicit namespace is never overwritten.
pub fn ensure_namespace(job: &mut Job) {
    let ns = &mut job.metadata.namespace;
    if ns.as_deref().is_none_or(str::is_empty) {
        *ns = Some(DEFAULT_NAMESPACE.to_string());
    }
}

/// Overwrite the ownership and group labels on the job and its pod template.
///
/// The group label always tracks the current name, even if the manifest
/// carried a stale one.
pub fn add_labels(job: &mut Job) {
    let name = job.metadata.name.clone();
    let labels = job.metadata.labels.get_or_insert_with(BTreeMap::new);
    labels.insert(MANAGED_LABEL.to_string(), JOB_MARKER.to_string());
    if let Some(name) = name {
        labels.insert(GROUP_LABEL.to_string(), name);
    }

    let template = &mut job.spec.get_or_insert_with(Default::default).template;
    template
        .metadata
        .get_or_insert_with(ObjectMeta::default)
        .labels
        .get_or_insert_with(BTreeMap::new)
        .insert(MANAGED_LABEL.to_string(), POD_MARKER.to_string());
}

/// Upsert `TERM_ON_EMPTY=1` into every container's environment.
///
/// Duplicate entries are collapsed to the first one, and a `valueFrom`
/// reference is dropped so the literal value applies.
pub fn ensure_term_on_empty(job: &mut Job) {
    for container in pod_spec_mut(job).containers.iter_mut() {
        let env = container.env.get_or_insert_with(Vec::new);

        let mut seen = false;
        env.retain(|var| {
            if var.name != TERM_ON_EMPTY {
                return true;
            }
            !std::mem::replace(&mut seen, true)
        });

        match env.iter_mut().find(|var| var.name == TERM_ON_EMPTY) {
            Some(var) => {
                var.value = Some(TERM_ON_EMPTY_VALUE.to_string());
                var.value_from = None;
            }
            None => env.push(EnvVar {
                name: TERM_ON_EMPTY.to_string(),
                value: Some(TERM_ON_EMPTY_VALUE.to_string()),
                value_from: None,
            }),
        }
    }
}

/// Default the pod restart policy. An explicit policy is never overwritten.
pub fn ensure_restart_policy(job: &mut Job) {
    pod_spec_mut(job)
        .restart_policy
        .get_or_insert_with(|| DEFAULT_RESTART_POLICY.to_string());
}

fn pod_spec_mut(job: &mut Job) -> &mut PodSpec {
    job.spec
        .get_or_insert_with(Default::default)
        .template
        .spec
        .get_or_insert_with(Default::default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::batch::v1::JobSpec;
    use k8s_openapi::api::core::v1::{Container, PodTemplateSpec};
    use proptest::prelude::*;
    use serde_json::json;

    fn manifest(value: serde_json::Value) -> Job {
        serde_json::from_value(value).unwrap()
    }

    fn render() -> Job {
        manifest(json!({
            "metadata": {"name": "render"},
            "spec": {
                "completions": 1,
                "template": {"spec": {"containers": [{"name": "c"}]}}
            }
        }))
    }

    fn term_on_empty_entries(job: &Job) -> Vec<Vec<EnvVar>> {
        job.spec
            .as_ref()
            .and_then(|s| s.template.spec.as_ref())
            .map(|spec| {
                spec.containers
                    .iter()
                    .map(|c| {
                        c.env
                            .clone()
                            .unwrap_or_default()
                            .into_iter()
                            .filter(|e| e.name == TERM_ON_EMPTY)
                            .collect::<Vec<_>>()
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    #[test]
    fn test_normalize_fills_defaults() {
        let mut job = render();
        normalize(&mut job);

        assert_eq!(job.metadata.namespace.as_deref(), Some("default"));
        let labels = job.metadata.labels.as_ref().unwrap();
        assert_eq!(labels.get("managed-job").map(String::as_str), Some("job"));
        assert_eq!(
            labels.get("managed-job-group").map(String::as_str),
            Some("render")
        );

        let template = &job.spec.as_ref().unwrap().template;
        let pod_labels = template.metadata.as_ref().unwrap().labels.as_ref().unwrap();
        assert_eq!(pod_labels.get("managed-job").map(String::as_str), Some("pod"));

        let pod_spec = template.spec.as_ref().unwrap();
        assert_eq!(pod_spec.restart_policy.as_deref(), Some("OnFailure"));
        let env = pod_spec.containers[0].env.as_ref().unwrap();
        assert_eq!(env.len(), 1);
        assert_eq!(env[0].name, "TERM_ON_EMPTY");
        assert_eq!(env[0].value.as_deref(), Some("1"));
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let mut once = manifest(json!({
            "metadata": {
                "name": "encode",
                "labels": {"managed-job-group": "stale", "team": "media"}
            },
            "spec": {
                "completions": 2,
                "template": {
                    "metadata": {"labels": {"tier": "batch"}},
                    "spec": {
                        "containers": [
                            {"name": "a", "env": [{"name": "TERM_ON_EMPTY", "value": "0"}]},
                            {"name": "b", "env": [{"name": "QUEUE", "value": "high"}]}
                        ]
                    }
                }
            }
        }));
        normalize(&mut once);

        let mut twice = once.clone();
        normalize(&mut twice);

        assert_eq!(once, twice);
    }

    #[test]
    fn test_term_on_empty_upserted_exactly_once() {
        let mut job = manifest(json!({
            "metadata": {"name": "render"},
            "spec": {
                "template": {
                    "spec": {
                        "containers": [
                            {"name": "fresh"},
                            {"name": "empty-env", "env": []},
                            {"name": "stale", "env": [
                                {"name": "OTHER", "value": "x"},
                                {"name": "TERM_ON_EMPTY", "value": "0"}
                            ]},
                            {"name": "dup", "env": [
                                {"name": "TERM_ON_EMPTY", "value": "a"},
                                {"name": "TERM_ON_EMPTY", "value": "b"}
                            ]}
                        ]
                    }
                }
            }
        }));

        ensure_term_on_empty(&mut job);
        ensure_term_on_empty(&mut job);

        for entries in term_on_empty_entries(&job) {
            assert_eq!(entries.len(), 1);
            assert_eq!(entries[0].value.as_deref(), Some("1"));
        }

        let containers = &job.spec.as_ref().unwrap().template.spec.as_ref().unwrap().containers;
        let stale_env = containers[2].env.as_ref().unwrap();
        assert_eq!(stale_env[0].name, "OTHER");
    }

    #[test]
    fn test_term_on_empty_drops_value_from() {
        let mut job = manifest(json!({
            "metadata": {"name": "render"},
            "spec": {"template": {"spec": {"containers": [{
                "name": "c",
                "env": [{"name": "TERM_ON_EMPTY", "valueFrom": {"fieldRef": {"fieldPath": "metadata.name"}}}]
            }]}}}
        }));

        ensure_term_on_empty(&mut job);

        let entries = term_on_empty_entries(&job);
        assert!(entries[0][0].value_from.is_none());
        assert_eq!(entries[0][0].value.as_deref(), Some("1"));
    }

    #[test]
    fn test_namespace_is_default_only() {
        let mut prod = render();
        prod.metadata.namespace = Some("prod".to_string());
        ensure_namespace(&mut prod);
        assert_eq!(prod.metadata.namespace.as_deref(), Some("prod"));

        let mut unset = render();
        ensure_namespace(&mut unset);
        assert_eq!(unset.metadata.namespace.as_deref(), Some("default"));

        let mut empty = render();
        empty.metadata.namespace = Some(String::new());
        ensure_namespace(&mut empty);
        assert_eq!(empty.metadata.namespace.as_deref(), Some("default"));
    }

    #[test]
    fn test_restart_policy_not_overwritten() {
        let mut job = manifest(json!({
            "metadata": {"name": "render"},
            "spec": {"template": {"spec": {"restartPolicy": "Never", "containers": []}}}
        }));

        ensure_restart_policy(&mut job);

        let spec = job.spec.unwrap().template.spec.unwrap();
        assert_eq!(spec.restart_policy.as_deref(), Some("Never"));
    }

    #[test]
    fn test_group_label_tracks_current_name() {
        let mut job = render();
        job.metadata.labels = Some(BTreeMap::from([(
            "managed-job-group".to_string(),
            "old-name".to_string(),
        )]));

        add_labels(&mut job);

        let labels = job.metadata.labels.unwrap();
        assert_eq!(labels["managed-job-group"], "render");
    }

    #[test]
    fn test_add_labels_creates_missing_template() {
        let mut job = manifest(json!({"metadata": {"name": "bare"}}));

        add_labels(&mut job);
        ensure_restart_policy(&mut job);

        let template = job.spec.unwrap().template;
        assert_eq!(template.metadata.unwrap().labels.unwrap()["managed-job"], "pod");
        assert_eq!(
            template.spec.unwrap().restart_policy.as_deref(),
            Some("OnFailure")
        );
    }

    #[test]
    fn test_group_name_requires_name() {
        let job = manifest(json!({"metadata": {}}));
        assert!(matches!(group_name(&job), Err(Error::InvalidManifest(_))));

        let job = manifest(json!({"metadata": {"name": ""}}));
        assert!(matches!(group_name(&job), Err(Error::InvalidManifest(_))));

        assert_eq!(group_name(&render()).unwrap(), "render");
    }

    #[test]
    fn test_group_name_accepts_subdomain_names() {
        for name in ["render.v2", "nightly-report.eu-west", "render_v2"] {
            let job = manifest(json!({"metadata": {"name": name}}));
            assert_eq!(group_name(&job).unwrap(), name);
        }
    }

    #[test]
    fn test_group_name_rejects_invalid_label_values() {
        let too_long = "a".repeat(64);
        for name in [".render", "render-", "render/v2", too_long.as_str()] {
            let job = manifest(json!({"metadata": {"name": name}}));
            assert!(
                matches!(group_name(&job), Err(Error::InvalidManifest(_))),
                "{name} should be rejected"
            );
        }
    }

    #[test]
    fn test_namespace_fallback() {
        assert_eq!(namespace(&render()), "default");
    }

    prop_compose! {
        fn arb_env()(vars in prop::collection::vec(
            (
                prop_oneof![Just(TERM_ON_EMPTY.to_string()), "[A-Z]{1,6}"],
                prop::option::of("[ -~]{0,4}"),
            ),
            0..5,
        )) -> Vec<EnvVar> {
            vars.into_iter()
                .map(|(name, value)| EnvVar { name, value, value_from: None })
                .collect()
        }
    }

    prop_compose! {
        fn arb_job()(
            name in prop::option::of("[a-z][a-z0-9.-]{0,10}"),
            namespace in prop::option::of(prop_oneof![Just(String::new()), "[a-z]{1,8}"]),
            stale_group in prop::option::of("[a-z]{1,8}"),
            has_spec in any::<bool>(),
            template_labels in prop::option::of(
                prop::collection::btree_map("[a-z]{1,6}", "[a-z0-9]{0,6}", 0..3)
            ),
            restart_policy in prop::option::of(prop_oneof![Just("Never"), Just("Always")]),
            containers in prop::option::of(prop::collection::vec(prop::option::of(arb_env()), 0..4)),
        ) -> Job {
            let pod_spec = containers.map(|envs| PodSpec {
                containers: envs
                    .into_iter()
                    .enumerate()
                    .map(|(i, env)| Container {
                        name: format!("c{i}"),
                        env,
                        ..Default::default()
                    })
                    .collect(),
                restart_policy: restart_policy.map(str::to_string),
                ..Default::default()
            });

            Job {
                metadata: ObjectMeta {
                    name,
                    namespace,
                    labels: stale_group.map(|g| BTreeMap::from([(GROUP_LABEL.to_string(), g)])),
                    ..Default::default()
                },
                spec: has_spec.then(|| JobSpec {
                    template: PodTemplateSpec {
                        metadata: template_labels.map(|labels| ObjectMeta {
                            labels: Some(labels),
                            ..Default::default()
                        }),
                        spec: pod_spec,
                    },
                    ..Default::default()
                }),
                ..Default::default()
            }
        }
    }

    proptest! {
        #[test]
        fn normalize_is_idempotent_for_any_manifest(job in arb_job()) {
            let mut once = job;
            normalize(&mut once);
            let mut twice = once.clone();
            normalize(&mut twice);

            prop_assert_eq!(once, twice);
        }

        #[test]
        fn every_container_has_exactly_one_term_on_empty(job in arb_job()) {
            let mut job = job;
            normalize(&mut job);

            for entries in term_on_empty_entries(&job) {
                prop_assert_eq!(entries.len(), 1);
                prop_assert_eq!(entries[0].value.as_deref(), Some(TERM_ON_EMPTY_VALUE));
                prop_assert!(entries[0].value_from.is_none());
            }
        }

        #[test]
        fn explicit_namespace_and_restart_policy_are_kept(job in arb_job()) {
            let namespace = job.metadata.namespace.clone().filter(|ns| !ns.is_empty());
            let restart_policy = job
                .spec
                .as_ref()
                .and_then(|s| s.template.spec.as_ref())
                .and_then(|s| s.restart_policy.clone());

            let mut job = job;
            normalize(&mut job);

            prop_assert_eq!(
                job.metadata.namespace.as_deref(),
                Some(namespace.as_deref().unwrap_or(DEFAULT_NAMESPACE))
            );
            let pod_spec = job.spec.as_ref().and_then(|s| s.template.spec.as_ref());
            prop_assert_eq!(
                pod_spec.and_then(|s| s.restart_policy.as_deref()),
                Some(restart_policy.as_deref().unwrap_or(DEFAULT_RESTART_POLICY))
            );

            let labels = job.metadata.labels.as_ref().unwrap();
            prop_assert_eq!(labels.get(MANAGED_LABEL).map(String::as_str), Some(JOB_MARKER));
            if let Some(name) = &job.metadata.name {
                prop_assert_eq!(labels.get(GROUP_LABEL), Some(name));
            }
        }
    }
}
