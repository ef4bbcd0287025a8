use sea_orm::{ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QuerySelect};
use uuid::Uuid;

use crate::entities::transaction;

pub async fn transaction_id_by_uuid<C: ConnectionTrait>(
    db: &C,
    uuid: Uuid,
) -> Result<Option<i64>, DbErr> {
    transaction::Entity::find()
        .select_only()
        .column(transaction::Column::Id)
        .filter(transaction::Column::Uuid.eq(uuid))
        .into_tuple()
        .one(db)
        .await
}

pub async fn transaction_uuid_by_id<C: ConnectionTrait>(
    db: &C,
    id: i64,
) -> Result<Option<Uuid>, DbErr> {
    transaction::Entity::find()
        .select_only()
        .column(transaction::Column::Uuid)
        .filter(transaction::Column::Id.eq(id))
        .into_tuple()
        .one(db)
        .await
}
