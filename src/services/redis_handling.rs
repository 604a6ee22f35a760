use redis::aio::MultiplexedConnection;
use tracing::debug;
use uuid::Uuid;

use crate::error::ServiceResult;
use crate::types::{ACTIVE_MENU_KEY, SESSION_KEY};

async fn connect(db: &redis::Client) -> ServiceResult<MultiplexedConnection> {
    Ok(db.get_multiplexed_async_connection().await?)
}

fn session_key(token: &str) -> String {
    format!("{SESSION_KEY}:{token}")
}

pub async fn create_session(db: &redis::Client, user_id: i64, ttl_secs: u64) -> ServiceResult<String> {
    let mut conn = connect(db).await?;
    let token = Uuid::new_v4().simple().to_string();

    redis::cmd("SET")
        .arg(session_key(&token))
        .arg(user_id)
        .arg("EX")
        .arg(ttl_secs)
        .query_async::<_, ()>(&mut conn)
        .await?;

    debug!(user_id, "Session created");
    Ok(token)
}

pub async fn session_user(db: &redis::Client, token: &str) -> ServiceResult<Option<i64>> {
    let mut conn = connect(db).await?;

    Ok(redis::cmd("GET")
        .arg(session_key(token))
        .query_async::<_, Option<i64>>(&mut conn)
        .await?)
}

pub async fn delete_session(db: &redis::Client, token: &str) -> ServiceResult<()> {
    let mut conn = connect(db).await?;

    redis::cmd("DEL")
        .arg(session_key(token))
        .query_async::<_, ()>(&mut conn)
        .await?;

    Ok(())
}

pub async fn get_menu(db: &redis::Client) -> ServiceResult<Option<String>> {
    let mut conn = connect(db).await?;

    Ok(redis::cmd("GET")
        .arg(ACTIVE_MENU_KEY)
        .query_async::<_, Option<String>>(&mut conn)
        .await?)
}

pub async fn put_menu(db: &redis::Client, menu_json: &str, ttl_secs: u64) -> ServiceResult<()> {
    let mut conn = connect(db).await?;

    redis::cmd("SET")
        .arg(ACTIVE_MENU_KEY)
        .arg(menu_json)
        .arg("EX")
        .arg(ttl_secs)
        .query_async::<_, ()>(&mut conn)
        .await?;

    Ok(())
}

pub async fn invalidate_menu(db: &redis::Client) -> ServiceResult<()> {
    let mut conn = connect(db).await?;

    redis::cmd("DEL")
        .arg(ACTIVE_MENU_KEY)
        .query_async::<_, ()>(&mut conn)
        .await?;

    debug!("Menu cache invalidated");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_keys_are_namespaced() {
        assert_eq!(session_key("abc"), "session:abc");
    }
}
