//! Suggested-action playbooks: a short, fixed list per reason, templated
//! only with `${name}`/`${namespace}`/`${container}` (spec §4.5 — "MUST NOT
//! fabricate resource-specific commands beyond templated parameters").

use crate::model::ResourceRecord;

pub fn playbook(reason: &str, resource: &ResourceRecord) -> Vec<String> {
    let template = match reason {
        "CrashLoopBackOff" => &[
            "inspect previous-container logs: kubectl logs ${name} -n ${namespace} --previous",
            "check the container's entrypoint and readiness of its dependencies",
            "check the last exit code for a non-zero application failure",
        ][..],
        "ImagePullBackOff" | "ErrImagePull" => &[
            "verify the image reference and tag exist in the registry",
            "check imagePullSecrets are present and valid for ${namespace}",
        ][..],
        "OOMKilled" => &[
            "raise the container's memory limit or reduce its working set",
            "check for a memory leak via previous-container logs",
        ][..],
        "FailedScheduling" => &[
            "check node capacity and taints: kubectl describe nodes",
            "review the pod's resource requests against available node capacity",
        ][..],
        "FailedMount" => &[
            "verify the referenced ConfigMap/Secret/PVC exists in ${namespace}",
            "check the PVC is Bound and not stuck Pending",
        ][..],
        "Unhealthy" => &[
            "check the readiness/liveness probe configuration for ${container}",
            "inspect recent logs for probe failures",
        ][..],
        "BackOff" => &["check recent events and container logs for the underlying failure"][..],
        "Evicted" => &[
            "check node pressure conditions at the time of eviction",
            "review the pod's resource requests relative to node allocatable",
        ][..],
        "NodeNotReady" | "NetworkNotReady" => &[
            "check node conditions: kubectl describe node",
            "check kubelet and CNI health on the affected node",
        ][..],
        _ => &["review the resource's status conditions and recent events"][..],
    };

    template
        .iter()
        .map(|t| {
            t.replace("${name}", &resource.name)
                .replace("${namespace}", &resource.namespace)
                .replace("${container}", "<container>")
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ResourceKind;

    #[test]
    fn templates_resource_identity() {
        let r = ResourceRecord::new(ResourceKind::Pod, "production", "failing-app-xyz");
        let actions = playbook("CrashLoopBackOff", &r);
        assert!(actions[0].contains("failing-app-xyz"));
        assert!(actions[0].contains("production"));
    }

    #[test]
    fn unknown_reason_gets_generic_action() {
        let r = ResourceRecord::new(ResourceKind::Generic("Widget".into()), "ns", "w1");
        let actions = playbook("SomeUnknownReason", &r);
        assert_eq!(actions.len(), 1);
    }
}
