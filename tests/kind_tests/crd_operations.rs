//! Integration tests for CRD operations
//!
//! These tests tell the story of how users declare Terraform resources through
//! the Kubernetes API before any controller acts on them.

use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::{Api, PostParams};

use terraform_operator::crd::{
    DependencyRef, GCS, GcsConfig, GcsSpec, Google, GoogleConfig, GoogleSpec, ResourceKind,
    TerraformResource,
};

use super::helpers::{ensure_test_cluster, force_delete, TEST_NAMESPACE};

fn google(name: &str, dep: Vec<DependencyRef>) -> Google {
    let mut obj = Google::new(
        name,
        GoogleSpec {
            dep,
            config: GoogleConfig {
                project: Some("acme-infra".to_string()),
                region: Some("europe-west1".to_string()),
                ..Default::default()
            },
        },
    );
    obj.metadata = ObjectMeta {
        name: Some(name.to_string()),
        namespace: Some(TEST_NAMESPACE.to_string()),
        ..Default::default()
    };
    obj
}

/// Story: a user declares a provider that depends on a module
///
/// The dependency list is persisted with the resource but never becomes part
/// of the configuration the provisioning tool reads.
#[tokio::test]
#[ignore = "requires kind cluster - run with: cargo test --test kind -- --ignored"]
async fn story_user_declares_provider_with_dependency() {
    let client = ensure_test_cluster()
        .await
        .expect("failed to setup cluster");
    let api: Api<Google> = Api::namespaced(client.clone(), TEST_NAMESPACE);
    let name = "crd-google-dep";
    force_delete::<Google>(&client, name).await;

    let created = api
        .create(
            &PostParams::default(),
            &google(name, vec![DependencyRef::new(ResourceKind::Module, "bucket")]),
        )
        .await
        .expect("failed to create provider");

    assert_eq!(
        created.spec.dep,
        vec![DependencyRef::new(ResourceKind::Module, "bucket")]
    );
    assert!(created.status.is_none(), "no controller has run yet");

    let record = created.to_record().expect("record projection");
    assert_eq!(
        record.config,
        serde_json::json!({"project": "acme-infra", "region": "europe-west1"})
    );

    force_delete::<Google>(&client, name).await;
}

/// Story: the module kind is served under its upper-case name
#[tokio::test]
#[ignore = "requires kind cluster - run with: cargo test --test kind -- --ignored"]
async fn story_user_lists_gcs_modules() {
    let client = ensure_test_cluster()
        .await
        .expect("failed to setup cluster");
    let api: Api<GCS> = Api::namespaced(client.clone(), TEST_NAMESPACE);
    let name = "crd-gcs-list";
    force_delete::<GCS>(&client, name).await;

    let mut module = GCS::new(
        name,
        GcsSpec {
            dep: vec![],
            config: GcsConfig {
                source: "git::https://example.com/modules/gcs.git".to_string(),
                ..Default::default()
            },
        },
    );
    module.metadata.namespace = Some(TEST_NAMESPACE.to_string());
    api.create(&PostParams::default(), &module)
        .await
        .expect("failed to create module");

    let listed = api.list(&Default::default()).await.expect("failed to list");
    assert!(listed.items.iter().any(|m| m.metadata.name.as_deref() == Some(name)));

    force_delete::<GCS>(&client, name).await;
}
