use crate::{cli::globals::GlobalArgs, vault};
use anyhow::Result;
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::future::Future;
use tokio::{
    sync::mpsc,
    time::{sleep, Duration},
};
use tracing::{debug, error, instrument, warn};

const MAX_ATTEMPTS: u32 = 3;
const MIN_RENEWAL: Duration = Duration::from_secs(1);

/// Renew at 70-90% of the lease so replicas do not renew in lockstep.
/// Never less than [`MIN_RENEWAL`], even for a zero lease.
fn jittered(lease_duration: u64, rng: &mut StdRng) -> Duration {
    let factor = rng.gen_range(70..90);
    Duration::from_secs(lease_duration.saturating_mul(factor) / 100).max(MIN_RENEWAL)
}

/// Keep calling `renew` before each lease runs out. After three failed
/// attempts in a row, signal `tx` and stop.
async fn renew_loop<F, Fut>(what: &'static str, tx: mpsc::UnboundedSender<()>, mut renew: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<u64>>,
{
    let mut rng = StdRng::from_entropy();
    let mut next_renewal = Duration::default();

    loop {
        for attempt in 1..=MAX_ATTEMPTS {
            let backoff_time = 2u64.pow(attempt - 1);

            if attempt > 1 {
                warn!("Backing off for {} seconds", backoff_time);
                sleep(Duration::from_secs(backoff_time)).await;
            }

            match renew().await {
                Ok(lease_duration) => {
                    next_renewal = jittered(lease_duration, &mut rng);
                    break;
                }

                Err(e) => {
                    error!("Failed to renew {}: {}", what, e);

                    if attempt == MAX_ATTEMPTS {
                        error!("Failed to renew {} after {} attempts: {}", what, MAX_ATTEMPTS, e);
                        let _ = tx.send(());
                        return;
                    }
                }
            }
        }

        debug!("Will renew {} in {} seconds", what, next_renewal.as_secs());

        sleep(next_renewal).await;
    }
}

/// Refresh the Vault token, and the database lease when one was issued.
/// # Errors
/// Returns an error if the renewal tasks cannot be set up.
#[instrument(skip(globals, tx))]
pub async fn try_renew(globals: &GlobalArgs, tx: mpsc::UnboundedSender<()>) -> Result<()> {
    tokio::spawn({
        let url = globals.vault_url.clone();
        let token = globals.vault_token.clone();
        let tx = tx.clone();

        async move {
            renew_loop("token", tx, || vault::renew_token(&url, &token)).await;
        }
    });

    if !globals.vault_db_lease_id.is_empty() {
        tokio::spawn({
            let url = globals.vault_url.clone();
            let token = globals.vault_token.clone();
            let lease_id = globals.vault_db_lease_id.clone();
            let increment = globals.vault_db_lease_duration;

            async move {
                renew_loop("DB lease", tx, || {
                    vault::renew_lease(&url, &token, &lease_id, increment)
                })
                .await;
            }
        });
    }

    Ok(())
}
