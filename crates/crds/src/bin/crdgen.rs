//! Print the KoorCluster CustomResourceDefinition as YAML.
//!
//! `cargo run -p crds --bin crdgen > config/crd/koorcluster.yaml`

use crds::KoorCluster;
use kube::CustomResourceExt;

fn main() -> anyhow::Result<()> {
    print!("{}", serde_yaml::to_string(&KoorCluster::crd())?);
    Ok(())
}
