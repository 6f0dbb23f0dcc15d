use anyhow::{Result, anyhow};
use autoscale_cuckoo_filter::CuckooFilter;
use futures_util::StreamExt;
use moka::future::Cache;
use once_cell::sync::Lazy;
use sqlx::MySqlPool;
use std::sync::RwLock;
use std::time::Duration;

/// Fast username-availability lookups for registration:
/// a cuckoo filter gives cheap definite negatives ("never seen"), a moka
/// cache gives cheap positives ("known taken"), and the database is the
/// fallback in between.

const FILTER_CAPACITY: usize = 100_000;
const FALSE_POSITIVE_RATE: f64 = 0.001;

static TAKEN_FILTER: Lazy<RwLock<CuckooFilter<String>>> =
    Lazy::new(|| RwLock::new(CuckooFilter::new(FILTER_CAPACITY, FALSE_POSITIVE_RATE)));

/// value is always true; only taken names are stored
static TAKEN_CACHE: Lazy<Cache<String, bool>> = Lazy::new(|| {
    Cache::builder()
        .max_capacity(500_000)
        .time_to_live(Duration::from_secs(86400)) // 24h TTL
        .build()
});

#[inline]
fn normalize(username: &str) -> String {
    username.to_lowercase()
}

/// False means the username definitely does not exist.
pub fn might_exist(username: &str) -> bool {
    TAKEN_FILTER
        .read()
        .expect("username filter poisoned")
        .contains(&normalize(username))
}

pub async fn is_known_taken(username: &str) -> bool {
    TAKEN_CACHE.get(&normalize(username)).await.unwrap_or(false)
}

/// Record a freshly registered username in both layers.
pub async fn mark_taken(username: &str) {
    let username = normalize(username);
    TAKEN_FILTER
        .write()
        .expect("username filter poisoned")
        .add(&username);
    TAKEN_CACHE.insert(username, true).await;
}

fn filter_insert_batch(usernames: &[String]) {
    let mut filter = TAKEN_FILTER.write().expect("username filter poisoned");
    for username in usernames {
        filter.add(username);
    }
}

/// Stream every username into the filter at startup.
pub async fn warmup_filter(pool: &MySqlPool, batch_size: usize) -> Result<()> {
    let mut stream = sqlx::query_as::<_, (String,)>("SELECT username FROM users").fetch(pool);

    let mut batch = Vec::with_capacity(batch_size);
    let mut total = 0usize;

    while let Some(row) = stream.next().await {
        let (username,) = row.map_err(|e| anyhow!("DB row fetch failed: {}", e))?;
        batch.push(normalize(&username));
        total += 1;

        if batch.len() == batch_size {
            filter_insert_batch(&batch);
            batch.clear();
        }
    }

    if !batch.is_empty() {
        filter_insert_batch(&batch);
    }

    log::info!("Username filter warmup complete: {} users", total);
    Ok(())
}

/// Pre-populate the taken cache with recently active accounts only.
pub async fn warmup_cache(pool: &MySqlPool, days: u32, batch_size: usize) -> Result<()> {
    let mut stream = sqlx::query_as::<_, (String,)>(
        r#"
        SELECT username
        FROM users
        WHERE last_login_at >= NOW() - INTERVAL ? DAY
        ORDER BY last_login_at DESC
        "#,
    )
    .bind(days)
    .fetch(pool);

    let mut batch = Vec::with_capacity(batch_size);
    let mut total = 0usize;

    while let Some(row) = stream.next().await {
        let (username,) = row.map_err(|e| anyhow!("DB row fetch failed: {}", e))?;
        batch.push(normalize(&username));
        total += 1;

        if batch.len() >= batch_size {
            cache_insert_batch(&batch).await;
            batch.clear();
        }
    }

    if !batch.is_empty() {
        cache_insert_batch(&batch).await;
    }

    log::info!(
        "Username cache warmup complete: {} recent users (last {} days)",
        total,
        days
    );
    Ok(())
}

async fn cache_insert_batch(usernames: &[String]) {
    let futures: Vec<_> = usernames
        .iter()
        .map(|u| TAKEN_CACHE.insert(u.clone(), true))
        .collect();
    futures::future::join_all(futures).await;
}
