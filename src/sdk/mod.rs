pub mod client;
pub mod compute_pools;
pub mod datatypes;
pub mod grants;
pub mod identifier;
pub mod image_repositories;
pub mod listings;
pub mod masking_policies;
pub mod policies;
pub mod programmatic_access_tokens;
pub mod record;
pub mod roles;
pub mod row_access_policies;
pub mod services;
pub mod snowflake;
pub mod sql;
