//! Subscription expiry job (spec.md §4.I): clears `isPro` for every user
//! whose `proEnd` has passed.

use chrono::Utc;
use tracing::warn;

use crate::repo::users;
use crate::state::AppState;

pub async fn run_tick(state: AppState) {
    let expired = match users::find_expired_pro(&state.pool, Utc::now()).await {
        Ok(ids) => ids,
        Err(err) => {
            warn!(error = %err, "subscription expiry: find_expired_pro failed");
            return;
        }
    };

    for user_id in expired {
        if let Err(err) = users::clear_pro(&state.pool, user_id).await {
            warn!(user_id = %user_id, error = %err, "subscription expiry: clear_pro failed");
        }
    }
}
