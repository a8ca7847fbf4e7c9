//! Ad account entity model
//!
//! SeaORM entity for the ad_accounts table: Meta ad accounts discovered
//! through a connection, with a per-account reporting toggle.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "ad_accounts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Connection this ad account was discovered through
    pub connection_id: Uuid,

    /// Meta ad account id without the `act_` prefix
    pub ad_account_id: String,

    pub account_name: Option<String>,

    /// ISO currency code reported by Meta
    pub currency: Option<String>,

    pub timezone: Option<String>,

    /// Meta account status code (1 = active, 2 = disabled, ...)
    pub account_status: Option<i32>,

    /// Whether this account is included in reporting
    pub is_active: bool,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::connection::Entity",
        from = "Column::ConnectionId",
        to = "super::connection::Column::Id"
    )]
    Connection,
}

impl Related<super::connection::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Connection.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
