//! Shared setup for the cluster-backed tests

use std::time::Duration;

use k8s_openapi::api::core::v1::Namespace;
use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use kube::api::{Api, DeleteParams, Patch, PatchParams};
use kube::runtime::wait::{await_condition, conditions};
use kube::Client;

use terraform_operator::crd::TerraformResource;

/// Namespace every story runs in
pub const TEST_NAMESPACE: &str = "terraform-operator-test";

const FIELD_MANAGER: &str = "terraform-operator-test";

/// Connect to the current kube context with CRDs and the test namespace in place
pub async fn ensure_test_cluster() -> Result<Client, Box<dyn std::error::Error>> {
    let client = Client::try_default().await?;
    install_crds(&client).await?;
    ensure_namespace(&client).await?;
    Ok(client)
}

async fn install_crds(client: &Client) -> Result<(), Box<dyn std::error::Error>> {
    let api: Api<CustomResourceDefinition> = Api::all(client.clone());
    for crd in terraform_operator::crd::all() {
        let name = crd.metadata.name.clone().unwrap_or_default();
        api.patch(
            &name,
            &PatchParams::apply(FIELD_MANAGER).force(),
            &Patch::Apply(&crd),
        )
        .await?;
        tokio::time::timeout(
            Duration::from_secs(30),
            await_condition(api.clone(), &name, conditions::is_crd_established()),
        )
        .await??;
    }
    Ok(())
}

async fn ensure_namespace(client: &Client) -> Result<(), Box<dyn std::error::Error>> {
    let api: Api<Namespace> = Api::all(client.clone());
    let ns = serde_json::json!({
        "apiVersion": "v1",
        "kind": "Namespace",
        "metadata": { "name": TEST_NAMESPACE }
    });
    api.patch(TEST_NAMESPACE, &PatchParams::apply(FIELD_MANAGER), &Patch::Apply(&ns))
        .await?;
    Ok(())
}

/// Remove a resource left over from an earlier run, finalizers included
pub async fn force_delete<K: TerraformResource>(client: &Client, name: &str) {
    let api: Api<K> = Api::namespaced(client.clone(), TEST_NAMESPACE);
    let clear = serde_json::json!({ "metadata": { "finalizers": null } });
    let _ = api
        .patch(name, &PatchParams::default(), &Patch::Merge(&clear))
        .await;
    let _ = api.delete(name, &DeleteParams::default()).await;
    wait_gone::<K>(client, name).await;
}

/// Wait until the API server no longer returns the resource
pub async fn wait_gone<K: TerraformResource>(client: &Client, name: &str) -> bool {
    let api: Api<K> = Api::namespaced(client.clone(), TEST_NAMESPACE);
    for _ in 0..50 {
        match api.get_opt(name).await {
            Ok(None) => return true,
            _ => tokio::time::sleep(Duration::from_millis(200)).await,
        }
    }
    false
}
