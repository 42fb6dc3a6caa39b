//! Follower and contact intake against the flat-file store.

use crate::domain::{ContactSubmission, SubscriberEmail};
use crate::errors::{AppError, StorageError};
use crate::models::{
    ContactRecord, ContactRequest, DEFAULT_TRIBE_COUNT, FollowerRecord, SOURCE_CONTACT_FORM,
    SOURCE_FOLLOW_FORM, SOURCE_FOLLOW_SECTION,
};
use crate::notify::{self, Notification};
use crate::state::AppState;
use crate::storage::StoreTxn;
use chrono::Utc;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    Joined { count: u64 },
    AlreadyMember { count: u64 },
}

impl JoinOutcome {
    pub fn count(self) -> u64 {
        match self {
            JoinOutcome::Joined { count } | JoinOutcome::AlreadyMember { count } => count,
        }
    }
}

/// Current tribe size; any storage failure reads as the default.
pub async fn tribe_count(state: &AppState) -> u64 {
    match state.store.lock().await.read_counter().await {
        Ok(counter) => counter.count,
        Err(err) => {
            warn!("error reading tribe count, using fallback: {err}");
            DEFAULT_TRIBE_COUNT
        }
    }
}

/// Case-insensitive membership test; storage failures answer `false`.
pub async fn is_follower(state: &AppState, email: &str) -> bool {
    let email = email.trim();
    if email.is_empty() {
        return false;
    }

    match state.store.lock().await.read_followers().await {
        Ok(followers) => followers.iter().any(|f| f.matches(email)),
        Err(err) => {
            warn!("error checking follower: {err}");
            false
        }
    }
}

/// Validates, deduplicates and records a new follower, returning the new count.
pub async fn add_follower(state: &AppState, raw_email: &str) -> Result<u64, AppError> {
    let email = SubscriberEmail::parse(raw_email)?;

    let outcome = {
        let txn = state.store.lock().await;
        join_tribe(&txn, &email, SOURCE_FOLLOW_SECTION, None).await?
    };

    match outcome {
        JoinOutcome::Joined { count } => {
            notify::dispatch(
                state.notifier.clone(),
                Notification::new_member(email.as_ref(), count, SOURCE_FOLLOW_SECTION),
            );
            Ok(count)
        }
        JoinOutcome::AlreadyMember { count } => Err(AppError::Duplicate { count }),
    }
}

/// Stores a contact message.
pub async fn record_contact(state: &AppState, request: &ContactRequest) -> Result<(), AppError> {
    let submission = ContactSubmission::parse(request)?;

    {
        let txn = state.store.lock().await;
        append_contact(&txn, &submission, SOURCE_CONTACT_FORM).await?;
    }
    info!(email = %submission.email, "contact message stored");

    notify::dispatch(
        state.notifier.clone(),
        Notification::contact(&submission.name, submission.email.as_ref(), &submission.message),
    );
    Ok(())
}

/// Combined follow form: joins the tribe if the email is new and always keeps the message.
pub async fn follow(state: &AppState, request: &ContactRequest) -> Result<JoinOutcome, AppError> {
    let submission = ContactSubmission::parse(request)?;

    let outcome = {
        // Message first: a failed contact write must not leave a committed,
        // unannounced count increment behind.
        let txn = state.store.lock().await;
        append_contact(&txn, &submission, SOURCE_FOLLOW_FORM).await?;
        join_tribe(
            &txn,
            &submission.email,
            SOURCE_FOLLOW_FORM,
            Some(submission.name.clone()),
        )
        .await?
    };

    if let JoinOutcome::Joined { count } = outcome {
        notify::dispatch(
            state.notifier.clone(),
            Notification::new_member(submission.email.as_ref(), count, SOURCE_FOLLOW_FORM),
        );
    }
    notify::dispatch(
        state.notifier.clone(),
        Notification::contact(&submission.name, submission.email.as_ref(), &submission.message),
    );
    Ok(outcome)
}

async fn join_tribe(
    txn: &StoreTxn<'_>,
    email: &SubscriberEmail,
    source: &str,
    name: Option<String>,
) -> Result<JoinOutcome, StorageError> {
    let mut followers = txn.read_followers().await?;
    let mut counter = txn.read_counter().await?;

    let key = email.match_key();
    if followers.iter().any(|f| f.matches(&key)) {
        return Ok(JoinOutcome::AlreadyMember {
            count: counter.count,
        });
    }

    let now = Utc::now();
    followers.push(FollowerRecord {
        email: email.to_string(),
        timestamp: now,
        source: source.to_string(),
        name,
    });
    counter.count = counter.count.saturating_add(1);
    counter.last_updated = now;

    txn.write_followers(&followers).await?;
    txn.write_counter(&counter).await?;

    info!(%email, count = counter.count, "new tribe member");
    Ok(JoinOutcome::Joined {
        count: counter.count,
    })
}

async fn append_contact(
    txn: &StoreTxn<'_>,
    submission: &ContactSubmission,
    source: &str,
) -> Result<(), StorageError> {
    let mut contacts = txn.read_contacts().await?;
    contacts.push(ContactRecord {
        name: submission.name.clone(),
        email: submission.email.to_string(),
        message: submission.message.clone(),
        timestamp: Utc::now(),
        source: source.to_string(),
    });
    txn.write_contacts(&contacts).await
}
