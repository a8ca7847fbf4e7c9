//! Connection entity model
//!
//! SeaORM entity for the connections table, which stores tenant-scoped Meta
//! user authorizations. Access tokens are stored encrypted.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde_json::Value as JsonValue;
use uuid::Uuid;

/// Connection entity representing a tenant-scoped Meta user authorization
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "connections")]
pub struct Model {
    /// Unique identifier for the connection (primary key)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Owning platform application identifier
    pub app_id: String,

    /// Owning organization, when the platform scopes by org
    pub org_id: Option<String>,

    /// Display label for the connection (optional)
    pub label: Option<String>,

    /// Meta user id the token belongs to
    pub meta_user_id: String,

    /// Meta user display name at connect time
    pub meta_user_name: Option<String>,

    /// Encrypted long-lived user access token (vault envelope)
    pub access_token: String,

    /// Token expiry, absent for tokens that do not expire
    pub token_expires_at: Option<DateTimeWithTimeZone>,

    /// Granted OAuth scopes, stored as a JSON array
    #[sea_orm(column_type = "JsonBinary")]
    pub scopes: Option<JsonValue>,

    /// Timestamp when the connection was created
    pub created_at: DateTimeWithTimeZone,

    /// Timestamp when the connection was last updated
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::ad_account::Entity")]
    AdAccounts,
    #[sea_orm(has_many = "super::page::Entity")]
    Pages,
}

impl Related<super::ad_account::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AdAccounts.def()
    }
}

impl Related<super::page::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Pages.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
