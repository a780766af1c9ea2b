//! Managed kinds. Each module holds one [`ManagedResource`] implementation.

use std::sync::Arc;

use crate::provider::ManagedResource;

pub mod account_role;
pub mod common;
pub mod compute_pool;
pub mod grant_account_role;
pub mod image_repository;
pub mod job_service;
pub mod listing;
pub mod masking_policy;
pub mod policy;
pub mod row_access_policy;
pub mod service;
pub mod user_programmatic_access_token;

/// Every kind the provider registers, keyed later by [`ManagedResource::name`].
pub fn all() -> Vec<Arc<dyn ManagedResource>> {
    vec![
        Arc::new(compute_pool::ComputePoolResource),
        Arc::new(service::ServiceResource),
        Arc::new(job_service::JobServiceResource),
        Arc::new(image_repository::ImageRepositoryResource),
        Arc::new(masking_policy::MaskingPolicyResource),
        Arc::new(row_access_policy::RowAccessPolicyResource),
        Arc::new(listing::ListingResource),
        Arc::new(account_role::AccountRoleResource),
        Arc::new(grant_account_role::GrantAccountRoleResource),
        Arc::new(user_programmatic_access_token::UserProgrammaticAccessTokenResource),
    ]
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_kind_names_are_unique() {
        let names: HashSet<&str> = all().iter().map(|r| r.name()).collect();
        assert_eq!(names.len(), all().len());
        assert!(names.iter().all(|n| n.starts_with("snowflake_")));
    }

    #[test]
    fn test_schemas_are_consistent() {
        for resource in all() {
            let schema = resource.schema();
            let capabilities = resource.capabilities();
            assert_eq!(
                capabilities.has_state_upgrader,
                !resource.state_upgraders().is_empty(),
                "{}",
                resource.name()
            );
            if capabilities.has_describe {
                assert!(schema.attribute("describe_output").is_some(), "{}", resource.name());
            }
        }
    }
}
