use std::collections::HashMap;

use actix::Handler;
use diesel::dsl::count_star;
use diesel::prelude::*;
use tracing::info;

use crate::error::{ServiceError, ServiceResult};
use crate::schema::{discussion_posts, discussion_topics, employees, menu_items, users};
use crate::services::db_models::{DiscussionPost, DiscussionTopic};
use crate::services::db_utils::PgActor;
use crate::services::insertable::{NewDiscussionPost, NewDiscussionTopic};
use crate::services::messages::{CreateTopic, FetchDiscussionSummary, FetchTopic, FetchTopics, ReplyToTopic};
use crate::services::views::{DiscussionSummary, PostView, TopicSummary, TopicThread, TopicTypeCount};
use crate::types::EmployeeType;

const RECENT_TOPICS: i64 = 5;

fn reply_counts(conn: &mut PgConnection) -> ServiceResult<HashMap<i64, i64>> {
    Ok(discussion_posts::table
        .group_by(discussion_posts::topic_id)
        .select((discussion_posts::topic_id, count_star()))
        .load::<(i64, i64)>(conn)?
        .into_iter()
        .collect())
}

fn summarize(topic: DiscussionTopic, author: String, replies: &HashMap<i64, i64>) -> TopicSummary {
    TopicSummary {
        reply_count: replies.get(&topic.id).copied().unwrap_or_default(),
        id: topic.id,
        title: topic.title,
        body: topic.body,
        topic_type: topic.topic_type,
        author,
        created_at: topic.created_at,
    }
}

fn topics(conn: &mut PgConnection, limit: Option<i64>) -> ServiceResult<Vec<TopicSummary>> {
    let mut query = discussion_topics::table
        .inner_join(users::table)
        .order(discussion_topics::created_at.desc())
        .select((DiscussionTopic::as_select(), users::username))
        .into_boxed();
    if let Some(limit) = limit {
        query = query.limit(limit);
    }

    let rows = query.load::<(DiscussionTopic, String)>(conn)?;
    let replies = reply_counts(conn)?;

    Ok(rows
        .into_iter()
        .map(|(topic, author)| summarize(topic, author, &replies))
        .collect())
}

fn staff_exists(conn: &mut PgConnection, employee_id: i64, kind: EmployeeType) -> ServiceResult<()> {
    let found: i64 = employees::table
        .filter(employees::id.eq(employee_id))
        .filter(employees::employee_type.eq(kind.as_str()))
        .count()
        .get_result(conn)?;
    if found == 0 {
        return Err(ServiceError::not_found(format!("No {kind} with id {employee_id}")));
    }
    Ok(())
}

impl Handler<FetchTopics> for PgActor {
    type Result = ServiceResult<Vec<TopicSummary>>;

    fn handle(&mut self, _msg: FetchTopics, _ctx: &mut Self::Context) -> Self::Result {
        let mut conn = self.connection()?;
        topics(&mut conn, None)
    }
}

impl Handler<CreateTopic> for PgActor {
    type Result = ServiceResult<DiscussionTopic>;

    fn handle(&mut self, msg: CreateTopic, _ctx: &mut Self::Context) -> Self::Result {
        if msg.title.trim().is_empty() || msg.body.trim().is_empty() {
            return Err(ServiceError::bad_request("Title and content are required"));
        }

        let mut conn = self.connection()?;

        if let Some(chef_id) = msg.related_chef_id {
            staff_exists(&mut conn, chef_id, EmployeeType::Chef)?;
        }
        if let Some(courier_id) = msg.related_delivery_id {
            staff_exists(&mut conn, courier_id, EmployeeType::Delivery)?;
        }
        if let Some(item_id) = msg.related_menu_item_id {
            let found: i64 = menu_items::table
                .filter(menu_items::id.eq(item_id))
                .count()
                .get_result(&mut conn)?;
            if found == 0 {
                return Err(ServiceError::not_found("Menu item not found"));
            }
        }

        let topic = diesel::insert_into(discussion_topics::table)
            .values(NewDiscussionTopic {
                author_id: msg.author_id,
                title: msg.title.trim().to_owned(),
                body: msg.body.trim().to_owned(),
                topic_type: msg.topic_type.as_str().to_owned(),
                related_chef_id: msg.related_chef_id,
                related_menu_item_id: msg.related_menu_item_id,
                related_delivery_id: msg.related_delivery_id,
            })
            .get_result::<DiscussionTopic>(&mut conn)?;

        info!(topic_id = topic.id, author_id = msg.author_id, "Discussion topic created");
        Ok(topic)
    }
}

impl Handler<FetchTopic> for PgActor {
    type Result = ServiceResult<TopicThread>;

    fn handle(&mut self, msg: FetchTopic, _ctx: &mut Self::Context) -> Self::Result {
        let mut conn = self.connection()?;

        let (topic, author) = discussion_topics::table
            .inner_join(users::table)
            .filter(discussion_topics::id.eq(msg.0))
            .select((DiscussionTopic::as_select(), users::username))
            .first::<(DiscussionTopic, String)>(&mut conn)
            .optional()?
            .ok_or_else(|| ServiceError::not_found("Topic not found"))?;

        let comments = discussion_posts::table
            .inner_join(users::table)
            .filter(discussion_posts::topic_id.eq(topic.id))
            .order(discussion_posts::created_at.asc())
            .select((DiscussionPost::as_select(), users::username))
            .load::<(DiscussionPost, String)>(&mut conn)?
            .into_iter()
            .map(|(post, author)| PostView {
                id: post.id,
                author,
                body: post.body,
                created_at: post.created_at,
            })
            .collect::<Vec<_>>();

        let replies = HashMap::from([(topic.id, comments.len() as i64)]);
        Ok(TopicThread {
            post: summarize(topic, author, &replies),
            comments,
        })
    }
}

impl Handler<ReplyToTopic> for PgActor {
    type Result = ServiceResult<DiscussionPost>;

    fn handle(&mut self, msg: ReplyToTopic, _ctx: &mut Self::Context) -> Self::Result {
        if msg.body.trim().is_empty() {
            return Err(ServiceError::bad_request("Reply content is required"));
        }

        let mut conn = self.connection()?;

        let exists: i64 = discussion_topics::table
            .filter(discussion_topics::id.eq(msg.topic_id))
            .count()
            .get_result(&mut conn)?;
        if exists == 0 {
            return Err(ServiceError::not_found("Topic not found"));
        }

        let post = diesel::insert_into(discussion_posts::table)
            .values(NewDiscussionPost {
                topic_id: msg.topic_id,
                author_id: msg.author_id,
                body: msg.body.trim().to_owned(),
            })
            .get_result::<DiscussionPost>(&mut conn)?;

        info!(topic_id = msg.topic_id, post_id = post.id, "Reply posted");
        Ok(post)
    }
}

impl Handler<FetchDiscussionSummary> for PgActor {
    type Result = ServiceResult<DiscussionSummary>;

    fn handle(&mut self, _msg: FetchDiscussionSummary, _ctx: &mut Self::Context) -> Self::Result {
        let mut conn = self.connection()?;

        let total_topics: i64 = discussion_topics::table.count().get_result(&mut conn)?;
        let total_replies: i64 = discussion_posts::table.count().get_result(&mut conn)?;

        let by_type = discussion_topics::table
            .group_by(discussion_topics::topic_type)
            .select((discussion_topics::topic_type, count_star()))
            .order(discussion_topics::topic_type.asc())
            .load::<(String, i64)>(&mut conn)?
            .into_iter()
            .map(|(topic_type, count)| TopicTypeCount { topic_type, count })
            .collect();

        Ok(DiscussionSummary {
            total_topics,
            total_replies,
            by_type,
            recent: topics(&mut conn, Some(RECENT_TOPICS))?,
        })
    }
}
