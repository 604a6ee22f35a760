use actix::Handler;
use diesel::prelude::*;
use tracing::{info, warn};

use crate::chatbot::KnowledgeSnippet;
use crate::error::{ServiceError, ServiceResult};
use crate::rules::validate_kb_rating;
use crate::schema::{kb_entries, kb_ratings, users};
use crate::services::db_models::KbEntry;
use crate::services::db_utils::PgActor;
use crate::services::insertable::{NewKbEntry, NewKbRating};
use crate::services::messages::{
    AddKbEntry, FetchFlaggedKb, FetchKnowledge, FetchMyKbEntries, ModerateKbEntry, RateKbEntry,
};
use crate::services::views::KbEntryView;

use super::load_user;

fn entry_view(conn: &mut PgConnection, entry_id: i64) -> ServiceResult<KbEntryView> {
    let (entry, author) = kb_entries::table
        .inner_join(users::table)
        .filter(kb_entries::id.eq(entry_id))
        .select((KbEntry::as_select(), users::username))
        .first::<(KbEntry, String)>(conn)
        .optional()?
        .ok_or_else(|| ServiceError::not_found("Knowledge base entry not found"))?;

    Ok(into_view(entry, author))
}

fn into_view(entry: KbEntry, author: String) -> KbEntryView {
    KbEntryView {
        average_rating: entry.average_rating(),
        entry,
        author,
    }
}

impl Handler<AddKbEntry> for PgActor {
    type Result = ServiceResult<KbEntry>;

    fn handle(&mut self, msg: AddKbEntry, _ctx: &mut Self::Context) -> Self::Result {
        if msg.question.trim().is_empty() || msg.answer.trim().is_empty() {
            return Err(ServiceError::bad_request("Question and answer are required"));
        }

        let mut conn = self.connection()?;
        let author = load_user(&mut conn, msg.user_id)?;

        if !author.role().is_staff() {
            return Err(ServiceError::forbidden("Only chefs and delivery staff can add entries"));
        }
        if !author.can_contribute_knowledge {
            return Err(ServiceError::forbidden("You are no longer allowed to contribute to the knowledge base"));
        }

        let entry = diesel::insert_into(kb_entries::table)
            .values(NewKbEntry {
                author_id: author.id,
                question: msg.question.trim().to_owned(),
                answer: msg.answer.trim().to_owned(),
                author_type: author.user_type.clone(),
            })
            .get_result::<KbEntry>(&mut conn)?;

        info!(entry_id = entry.id, author_id = author.id, "Knowledge base entry added");
        Ok(entry)
    }
}

impl Handler<FetchMyKbEntries> for PgActor {
    type Result = ServiceResult<Vec<KbEntryView>>;

    fn handle(&mut self, msg: FetchMyKbEntries, _ctx: &mut Self::Context) -> Self::Result {
        let mut conn = self.connection()?;

        let rows = kb_entries::table
            .inner_join(users::table)
            .filter(kb_entries::author_id.eq(msg.0))
            .order(kb_entries::created_at.desc())
            .select((KbEntry::as_select(), users::username))
            .load::<(KbEntry, String)>(&mut conn)?;

        Ok(rows.into_iter().map(|(entry, author)| into_view(entry, author)).collect())
    }
}

impl Handler<RateKbEntry> for PgActor {
    type Result = ServiceResult<KbEntryView>;

    fn handle(&mut self, msg: RateKbEntry, _ctx: &mut Self::Context) -> Self::Result {
        let flags = validate_kb_rating(msg.rating)?;
        let mut conn = self.connection()?;

        conn.build_transaction().run::<_, ServiceError, _>(|conn| {
            let entry = entry_view(conn, msg.entry_id)?.entry;
            if entry.is_removed {
                return Err(ServiceError::not_found("Knowledge base entry not found"));
            }
            if entry.author_id == msg.user_id {
                return Err(ServiceError::bad_request("You cannot rate your own entry"));
            }

            let rated: i64 = kb_ratings::table
                .filter(kb_ratings::entry_id.eq(entry.id))
                .filter(kb_ratings::user_id.eq(msg.user_id))
                .count()
                .get_result(conn)?;
            if rated > 0 {
                return Err(ServiceError::conflict("You have already rated this entry"));
            }

            diesel::insert_into(kb_ratings::table)
                .values(NewKbRating {
                    entry_id: entry.id,
                    user_id: msg.user_id,
                    rating: msg.rating,
                })
                .execute(conn)?;

            diesel::update(kb_entries::table.find(entry.id))
                .set((
                    kb_entries::rating_sum.eq(kb_entries::rating_sum + i64::from(msg.rating)),
                    kb_entries::rating_count.eq(kb_entries::rating_count + 1),
                    kb_entries::is_flagged.eq(kb_entries::is_flagged.or::<bool, diesel::sql_types::Bool>(flags)),
                ))
                .execute(conn)?;

            if flags {
                warn!(entry_id = entry.id, "Knowledge base entry flagged for review");
            }

            entry_view(conn, entry.id)
        })
    }
}

impl Handler<FetchFlaggedKb> for PgActor {
    type Result = ServiceResult<Vec<KbEntryView>>;

    fn handle(&mut self, _msg: FetchFlaggedKb, _ctx: &mut Self::Context) -> Self::Result {
        let mut conn = self.connection()?;

        let rows = kb_entries::table
            .inner_join(users::table)
            .filter(kb_entries::is_flagged.eq(true))
            .filter(kb_entries::is_removed.eq(false))
            .order(kb_entries::created_at.asc())
            .select((KbEntry::as_select(), users::username))
            .load::<(KbEntry, String)>(&mut conn)?;

        Ok(rows.into_iter().map(|(entry, author)| into_view(entry, author)).collect())
    }
}

impl Handler<ModerateKbEntry> for PgActor {
    type Result = ServiceResult<KbEntryView>;

    fn handle(&mut self, msg: ModerateKbEntry, _ctx: &mut Self::Context) -> Self::Result {
        let mut conn = self.connection()?;

        conn.build_transaction().run::<_, ServiceError, _>(|conn| {
            let entry = entry_view(conn, msg.entry_id)?.entry;

            if msg.remove {
                diesel::update(kb_entries::table.find(entry.id))
                    .set(kb_entries::is_removed.eq(true))
                    .execute(conn)?;
            } else {
                diesel::update(kb_entries::table.find(entry.id))
                    .set((kb_entries::is_flagged.eq(false), kb_entries::is_removed.eq(false)))
                    .execute(conn)?;
            }

            if msg.ban_author {
                diesel::update(users::table.find(entry.author_id))
                    .set(users::can_contribute_knowledge.eq(false))
                    .execute(conn)?;
                warn!(author_id = entry.author_id, "Author banned from the knowledge base");
            }

            info!(entry_id = entry.id, removed = msg.remove, "Knowledge base entry moderated");
            entry_view(conn, entry.id)
        })
    }
}

impl Handler<FetchKnowledge> for PgActor {
    type Result = ServiceResult<Vec<KnowledgeSnippet>>;

    fn handle(&mut self, _msg: FetchKnowledge, _ctx: &mut Self::Context) -> Self::Result {
        let mut conn = self.connection()?;

        let entries = kb_entries::table
            .filter(kb_entries::is_removed.eq(false))
            .select(KbEntry::as_select())
            .load::<KbEntry>(&mut conn)?;

        Ok(entries.iter().map(KnowledgeSnippet::from).collect())
    }
}
