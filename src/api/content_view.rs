use std::collections::HashMap;

use actix_web::HttpRequest;
use chrono::Utc;
use sea_orm::{ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QuerySelect, Set};
use sea_query::{Expr, OnConflict};

use crate::entity::content_view::{self, Column, Entity as ContentViewEntity};

pub const ISSUE_CONTENT_TYPE: &str = "issue";

/// Records that `user_id` looked at an object from `viewer_ip`.
/// A repeat view from the same viewer and address only refreshes `last_viewed`.
pub async fn record_view<C: ConnectionTrait>(
    db: &C,
    content_type: &str,
    object_id: i32,
    user_id: i32,
    viewer_ip: &str,
) -> Result<(), DbErr> {
    let now = Utc::now();
    let view = content_view::ActiveModel {
        content_type: Set(content_type.to_string()),
        object_id: Set(object_id),
        user_id: Set(user_id),
        viewer_ip: Set(viewer_ip.to_string()),
        last_viewed: Set(now),
        created_at: Set(now),
        ..Default::default()
    };

    ContentViewEntity::insert(view)
        .on_conflict(
            OnConflict::columns([Column::ContentType, Column::ObjectId, Column::UserId, Column::ViewerIp])
                .update_column(Column::LastViewed)
                .to_owned(),
        )
        .exec_without_returning(db)
        .await?;

    Ok(())
}

/// Distinct view records per object id. Objects nobody has viewed are absent.
pub async fn view_counts<C: ConnectionTrait>(
    db: &C,
    content_type: &str,
    object_ids: &[i32],
) -> Result<HashMap<i32, u64>, DbErr> {
    if object_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let rows: Vec<(i32, i64)> = ContentViewEntity::find()
        .select_only()
        .column(Column::ObjectId)
        .column_as(Expr::col(Column::Id).count(), "views")
        .filter(Column::ContentType.eq(content_type))
        .filter(Column::ObjectId.is_in(object_ids.iter().copied()))
        .group_by(Column::ObjectId)
        .into_tuple()
        .all(db)
        .await?;

    Ok(rows
        .into_iter()
        .map(|(object_id, views)| (object_id, views.max(0) as u64))
        .collect())
}

pub async fn forget_views<C: ConnectionTrait>(db: &C, content_type: &str, object_id: i32) -> Result<u64, DbErr> {
    let result = ContentViewEntity::delete_many()
        .filter(Column::ContentType.eq(content_type))
        .filter(Column::ObjectId.eq(object_id))
        .exec(db)
        .await?;
    Ok(result.rows_affected)
}

/// First `X-Forwarded-For` hop, then the socket peer, then `"unknown"`.
pub fn viewer_ip(req: &HttpRequest) -> String {
    req.headers()
        .get("X-Forwarded-For")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .map(str::to_string)
        .or_else(|| req.peer_addr().map(|addr| addr.ip().to_string()))
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    #[test]
    fn forwarded_for_wins_and_takes_the_first_hop() {
        let req = TestRequest::default()
            .insert_header(("X-Forwarded-For", "203.0.113.5, 10.0.0.1"))
            .peer_addr("192.0.2.1:4000".parse().unwrap())
            .to_http_request();
        assert_eq!(viewer_ip(&req), "203.0.113.5");
    }

    #[test]
    fn falls_back_to_peer_address() {
        let req = TestRequest::default()
            .peer_addr("192.0.2.1:4000".parse().unwrap())
            .to_http_request();
        assert_eq!(viewer_ip(&req), "192.0.2.1");
    }

    #[test]
    fn unknown_without_any_source() {
        let req = TestRequest::default().to_http_request();
        assert_eq!(viewer_ip(&req), "unknown");
    }
}
