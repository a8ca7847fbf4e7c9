//! Page entity model
//!
//! SeaORM entity for the pages table: Facebook pages (and linked Instagram
//! accounts) discovered through a connection. Page tokens are stored
//! encrypted, like user tokens.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "pages")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Connection this page was discovered through
    pub connection_id: Uuid,

    /// Meta page id
    pub page_id: String,

    pub page_name: Option<String>,

    /// Encrypted page access token (vault envelope)
    pub page_access_token: String,

    /// Linked Instagram business account id, when present
    pub instagram_account_id: Option<String>,

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
