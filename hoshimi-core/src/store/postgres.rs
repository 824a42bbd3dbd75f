//! PostgreSQL persistence backend.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, Transaction};

use hoshimi_model::{
    Actor, ActorId, ActorRoster, JstTime, Plan, PlanEntry, PlanText, TimeRange, Video, VideoId,
};

use crate::error::{CoreError, Result};
use crate::store::{
    merge_into_stored, union_related_ids, ActorStore, NotifyTransition, PlanStore, VideoStore,
};

#[derive(Clone, Debug)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new().max_connections(8).connect(url).await?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[derive(sqlx::FromRow)]
struct PlanRow {
    date: DateTime<Utc>,
    revision_tag: Option<String>,
    source_id: String,
    notified: bool,
    fixed: bool,
    entries: Json<Vec<PlanEntry>>,
    texts: Json<Vec<PlanText>>,
}

impl PlanRow {
    fn into_plan(self) -> Plan {
        Plan {
            date: JstTime::from_utc(self.date),
            revision_tag: self.revision_tag,
            source_id: self.source_id,
            entries: self.entries.0,
            texts: self.texts.0,
            notified: self.notified,
            fixed: self.fixed,
        }
    }
}

const SELECT_PLAN: &str =
    "SELECT date, revision_tag, source_id, notified, fixed, entries, texts FROM plans";

async fn fetch_plan_for_update(
    tx: &mut Transaction<'_, Postgres>,
    date: JstTime,
) -> Result<Option<Plan>> {
    let row = sqlx::query_as::<_, PlanRow>(&format!("{SELECT_PLAN} WHERE date = $1 FOR UPDATE"))
        .bind(date.floor_to_day().to_utc())
        .fetch_optional(&mut **tx)
        .await?;

    Ok(row.map(PlanRow::into_plan))
}

async fn upsert_plan(tx: &mut Transaction<'_, Postgres>, plan: &Plan) -> Result<()> {
    sqlx::query(
        "INSERT INTO plans (date, revision_tag, source_id, notified, fixed, entries, texts) \
         VALUES ($1, $2, $3, $4, $5, $6, $7) \
         ON CONFLICT (date) DO UPDATE SET \
             revision_tag = EXCLUDED.revision_tag, \
             source_id = EXCLUDED.source_id, \
             notified = EXCLUDED.notified, \
             fixed = EXCLUDED.fixed, \
             entries = EXCLUDED.entries, \
             texts = EXCLUDED.texts",
    )
    .bind(plan.date.floor_to_day().to_utc())
    .bind(&plan.revision_tag)
    .bind(&plan.source_id)
    .bind(plan.notified)
    .bind(plan.fixed)
    .bind(Json(&plan.entries))
    .bind(Json(&plan.texts))
    .execute(&mut **tx)
    .await?;

    Ok(())
}

#[async_trait]
impl PlanStore for PostgresStore {
    async fn find_plans(&self, range: TimeRange) -> Result<Vec<Plan>> {
        let rows = sqlx::query_as::<_, PlanRow>(&format!(
            "{SELECT_PLAN} WHERE date >= $1 AND date <= $2 ORDER BY date",
        ))
        .bind(range.begin.to_utc())
        .bind(range.end.to_utc())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(PlanRow::into_plan).collect())
    }

    async fn find_latest_plan(&self) -> Result<Plan> {
        let row = sqlx::query_as::<_, PlanRow>(&format!("{SELECT_PLAN} ORDER BY date DESC LIMIT 1"))
            .fetch_optional(&self.pool)
            .await?;

        row.map(PlanRow::into_plan).ok_or(CoreError::NotFound)
    }

    async fn save_plan(&self, plan: &Plan) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        let stored = fetch_plan_for_update(&mut tx, plan.date).await?;
        // A fixed plan leaves the transaction without writes; dropping it
        // rolls back.
        let merged = merge_into_stored(stored.as_ref(), plan)?;
        upsert_plan(&mut tx, &merged).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn save_plan_forced(&self, plan: &Plan) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        upsert_plan(&mut tx, plan).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn mark_plan_notified(&self, date: JstTime) -> Result<NotifyTransition<Plan>> {
        let mut tx = self.pool.begin().await?;
        let Some(mut plan) = fetch_plan_for_update(&mut tx, date).await? else {
            return Ok(NotifyTransition::noop(None));
        };

        if plan.notified {
            return Ok(NotifyTransition::noop(Some(plan)));
        }

        plan.notified = true;
        sqlx::query("UPDATE plans SET notified = TRUE WHERE date = $1")
            .bind(plan.date.to_utc())
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(NotifyTransition::updated(plan))
    }
}

#[derive(sqlx::FromRow)]
struct VideoRow {
    id: String,
    actor_id: String,
    related_actor_id: String,
    related_actor_ids: Json<Vec<ActorId>>,
    owner_name: String,
    source: String,
    url: String,
    description: String,
    hashtags: Json<Vec<String>>,
    is_live: bool,
    member_only: bool,
    notified: bool,
    start_at: DateTime<Utc>,
}

impl VideoRow {
    fn into_video(self) -> Result<Video> {
        let source = self
            .source
            .parse()
            .map_err(|e: hoshimi_model::ParseVideoSourceError| {
                CoreError::InvalidRecord(e.to_string())
            })?;

        Ok(Video {
            id: VideoId::new(self.id),
            actor_id: ActorId::new(self.actor_id),
            related_actor_id: ActorId::new(self.related_actor_id),
            related_actor_ids: self.related_actor_ids.0,
            owner_name: self.owner_name,
            source,
            url: self.url,
            text: self.description,
            hashtags: self.hashtags.0,
            is_live: self.is_live,
            member_only: self.member_only,
            notified: self.notified,
            start_at: JstTime::from_utc(self.start_at),
        })
    }
}

const SELECT_VIDEO: &str = "SELECT id, actor_id, related_actor_id, related_actor_ids, \
     owner_name, source, url, description, hashtags, is_live, member_only, notified, start_at \
     FROM videos";

async fn fetch_video_for_update(
    tx: &mut Transaction<'_, Postgres>,
    id: &VideoId,
) -> Result<Option<Video>> {
    let row = sqlx::query_as::<_, VideoRow>(&format!("{SELECT_VIDEO} WHERE id = $1 FOR UPDATE"))
        .bind(id.as_str())
        .fetch_optional(&mut **tx)
        .await?;

    row.map(VideoRow::into_video).transpose()
}

async fn upsert_video(tx: &mut Transaction<'_, Postgres>, video: &Video) -> Result<()> {
    sqlx::query(
        "INSERT INTO videos (id, actor_id, related_actor_id, related_actor_ids, owner_name, \
             source, url, description, hashtags, is_live, member_only, notified, start_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13) \
         ON CONFLICT (id) DO UPDATE SET \
             actor_id = EXCLUDED.actor_id, \
             related_actor_id = EXCLUDED.related_actor_id, \
             related_actor_ids = EXCLUDED.related_actor_ids, \
             owner_name = EXCLUDED.owner_name, \
             source = EXCLUDED.source, \
             url = EXCLUDED.url, \
             description = EXCLUDED.description, \
             hashtags = EXCLUDED.hashtags, \
             is_live = EXCLUDED.is_live, \
             member_only = EXCLUDED.member_only, \
             notified = EXCLUDED.notified, \
             start_at = EXCLUDED.start_at",
    )
    .bind(video.id.as_str())
    .bind(video.actor_id.as_str())
    .bind(video.related_actor_id.as_str())
    .bind(Json(&video.related_actor_ids))
    .bind(&video.owner_name)
    .bind(video.source.as_str())
    .bind(&video.url)
    .bind(&video.text)
    .bind(Json(&video.hashtags))
    .bind(video.is_live)
    .bind(video.member_only)
    .bind(video.notified)
    .bind(video.start_at.to_utc())
    .execute(&mut **tx)
    .await?;

    Ok(())
}

#[async_trait]
impl VideoStore for PostgresStore {
    async fn find_videos(&self, range: TimeRange) -> Result<Vec<Video>> {
        let rows = sqlx::query_as::<_, VideoRow>(&format!(
            "{SELECT_VIDEO} WHERE start_at >= $1 AND start_at <= $2 ORDER BY start_at",
        ))
        .bind(range.begin.to_utc())
        .bind(range.end.to_utc())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(VideoRow::into_video).collect()
    }

    async fn find_unnotified_videos(&self) -> Result<Vec<Video>> {
        let rows =
            sqlx::query_as::<_, VideoRow>(&format!("{SELECT_VIDEO} WHERE notified = FALSE ORDER BY start_at"))
                .fetch_all(&self.pool)
                .await?;

        rows.into_iter().map(VideoRow::into_video).collect()
    }

    async fn save_video(&self, video: &Video) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let merged = match fetch_video_for_update(&mut tx, &video.id).await? {
            Some(stored) => {
                // A resolved attribution must not be downgraded to unknown
                // by a participant's later announcement of the same video.
                if !stored.actor_id.is_unknown() && video.actor_id.is_unknown() {
                    return Ok(());
                }

                let mut merged = video.clone();
                merged.notified = stored.notified;
                merged.related_actor_ids = union_related_ids(video, &stored);
                merged
            }
            None => video.clone(),
        };

        upsert_video(&mut tx, &merged).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn mark_video_notified(&self, id: &VideoId) -> Result<NotifyTransition<Video>> {
        let mut tx = self.pool.begin().await?;
        let Some(mut video) = fetch_video_for_update(&mut tx, id).await? else {
            // Deleted or replaced concurrently.
            return Ok(NotifyTransition::noop(None));
        };

        if video.notified {
            return Ok(NotifyTransition::noop(Some(video)));
        }

        video.notified = true;
        sqlx::query("UPDATE videos SET notified = TRUE WHERE id = $1")
            .bind(id.as_str())
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(NotifyTransition::updated(video))
    }
}

#[derive(sqlx::FromRow)]
struct ActorRow {
    id: String,
    name: String,
    icon: String,
    screen_name: String,
    hashtag: String,
    emoji: String,
    youtube_channel_id: String,
    bilibili_id: Option<String>,
    mildom_id: Option<String>,
    last_announcement_id: String,
}

impl ActorRow {
    fn into_actor(self) -> Actor {
        Actor {
            id: ActorId::new(self.id),
            name: self.name,
            icon: self.icon,
            screen_name: self.screen_name,
            hashtag: self.hashtag,
            emoji: self.emoji,
            youtube_channel_id: self.youtube_channel_id,
            bilibili_id: self.bilibili_id,
            mildom_id: self.mildom_id,
            last_announcement_id: self.last_announcement_id,
        }
    }
}

#[async_trait]
impl ActorStore for PostgresStore {
    async fn find_actors(&self) -> Result<ActorRoster> {
        let rows = sqlx::query_as::<_, ActorRow>(
            "SELECT id, name, icon, screen_name, hashtag, emoji, youtube_channel_id, \
                 bilibili_id, mildom_id, last_announcement_id \
             FROM actors ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(ActorRoster::new(
            rows.into_iter().map(ActorRow::into_actor).collect(),
        ))
    }

    async fn save_actor(&self, actor: &Actor) -> Result<()> {
        sqlx::query(
            "INSERT INTO actors (id, name, icon, screen_name, hashtag, emoji, \
                 youtube_channel_id, bilibili_id, mildom_id, last_announcement_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
             ON CONFLICT (id) DO UPDATE SET \
                 name = EXCLUDED.name, \
                 icon = EXCLUDED.icon, \
                 screen_name = EXCLUDED.screen_name, \
                 hashtag = EXCLUDED.hashtag, \
                 emoji = EXCLUDED.emoji, \
                 youtube_channel_id = EXCLUDED.youtube_channel_id, \
                 bilibili_id = EXCLUDED.bilibili_id, \
                 mildom_id = EXCLUDED.mildom_id, \
                 last_announcement_id = EXCLUDED.last_announcement_id",
        )
        .bind(actor.id.as_str())
        .bind(&actor.name)
        .bind(&actor.icon)
        .bind(&actor.screen_name)
        .bind(&actor.hashtag)
        .bind(&actor.emoji)
        .bind(&actor.youtube_channel_id)
        .bind(&actor.bilibili_id)
        .bind(&actor.mildom_id)
        .bind(&actor.last_announcement_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
