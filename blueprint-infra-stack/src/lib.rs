//! Stack composition for blueprint-infra.
//!
//! Turns a validated [`Config`](blueprint_infra_config::Config) into one
//! declarative [`DeploymentManifest`]: the monthly billing report job, the
//! static site's bucket and distribution, and the GitHub deploy role whose
//! policies reference the site's identifiers.
//!
//! Resources that are referenced by identifier are created through a
//! [`Provisioner`] before anything that names them is built; the resulting
//! [`ResourceRef`](blueprint_infra_policy::ResourceRef)s are passed along as
//! values rather than inferred from declaration order.

mod composer;
mod error;
mod manifest;
mod provisioner;

pub use composer::{compose, DeployRole, SiteResources, StackComposer, STACK_NAME};
pub use error::{StackError, StackResult};
pub use manifest::{
    DeploymentManifest, FunctionEnvironment, ResourceDeclaration, ResourceProperties,
    StackOutputs,
};
pub use provisioner::{DeclarativeProvisioner, Provisioner};
