//! Client-side follow widget and contact form flow.
//!
//! The widget owns its state; the backend is the single source of truth for
//! membership and the tribe count. The displayed count only ever changes to
//! a value the server returned.

use crate::client::{ClientError, TribeApi};
use crate::domain::{ContactSubmission, SubscriberEmail};
use crate::models::{ALREADY_MEMBER_MESSAGE, ContactRequest, ContactResponse};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

pub const VERIFY_DELAY: Duration = Duration::from_millis(2000);
pub const RESET_DELAY: Duration = Duration::from_millis(5000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowState {
    Unverified,
    Verifying,
    Verified,
    Submitting,
    Done,
    /// Absorbing for the session; only [`FollowWidget::new_session`] leaves it.
    AlreadyMember,
}

#[derive(Debug, Clone, Copy)]
pub struct WidgetTimings {
    pub verify_delay: Duration,
    pub reset_delay: Duration,
}

impl Default for WidgetTimings {
    fn default() -> Self {
        Self {
            verify_delay: VERIFY_DELAY,
            reset_delay: RESET_DELAY,
        }
    }
}

#[derive(Debug, Error)]
pub enum WidgetError {
    #[error("{0}")]
    Invalid(String),

    #[error("Please verify your email first")]
    NotVerified,

    #[error("{}", ALREADY_MEMBER_MESSAGE)]
    AlreadyMember,

    #[error("cannot {action} while {state:?}")]
    InvalidTransition {
        action: &'static str,
        state: FollowState,
    },

    #[error("Something went wrong. Please try again.")]
    Network(#[from] ClientError),
}

pub struct FollowWidget<A> {
    api: A,
    timings: WidgetTimings,
    state: FollowState,
    email: Option<SubscriberEmail>,
    displayed_count: Option<u64>,
}

impl<A: TribeApi> FollowWidget<A> {
    pub fn new(api: A, timings: WidgetTimings) -> Self {
        Self {
            api,
            timings,
            state: FollowState::Unverified,
            email: None,
            displayed_count: None,
        }
    }

    pub fn state(&self) -> FollowState {
        self.state
    }

    pub fn email(&self) -> Option<&SubscriberEmail> {
        self.email.as_ref()
    }

    pub fn displayed_count(&self) -> Option<u64> {
        self.displayed_count
    }

    pub fn can_submit(&self) -> bool {
        self.state == FollowState::Verified
    }

    pub async fn refresh_count(&mut self) -> Result<u64, WidgetError> {
        let count = self.api.tribe_count().await?;
        self.displayed_count = Some(count);
        Ok(count)
    }

    /// Runs the whole verification: format check, membership check, simulated delay.
    pub async fn verify(&mut self, input: &str) -> Result<FollowState, WidgetError> {
        if self.begin_verification(input).await? == FollowState::Verifying {
            tokio::time::sleep(self.timings.verify_delay).await;
            self.complete_verification()?;
        }
        Ok(self.state)
    }

    /// `Unverified` to `Verifying`, or to `AlreadyMember` if the backend knows the email.
    pub async fn begin_verification(&mut self, input: &str) -> Result<FollowState, WidgetError> {
        self.expect_state(FollowState::Unverified, "verify")?;

        let email =
            SubscriberEmail::parse(input).map_err(|err| WidgetError::Invalid(err.to_string()))?;

        let member = self.api.is_follower(email.as_ref()).await?;
        self.email = Some(email);
        self.state = if member {
            FollowState::AlreadyMember
        } else {
            FollowState::Verifying
        };
        debug!(state = ?self.state, "verification started");
        Ok(self.state)
    }

    pub fn complete_verification(&mut self) -> Result<(), WidgetError> {
        self.expect_state(FollowState::Verifying, "complete verification")?;
        self.state = FollowState::Verified;
        Ok(())
    }

    /// Sends the verified email to the backend and returns the new tribe count.
    ///
    /// On success the widget stays in `Done` so the caller can show the
    /// result; call [`FollowWidget::finish`] afterwards, or use
    /// [`FollowWidget::submit_and_reset`] to do both.
    pub async fn submit(&mut self) -> Result<u64, WidgetError> {
        match self.state {
            FollowState::Verified => {}
            FollowState::AlreadyMember => return Err(WidgetError::AlreadyMember),
            _ => return Err(WidgetError::NotVerified),
        }
        let Some(email) = self.email.clone() else {
            return Err(WidgetError::NotVerified);
        };

        self.state = FollowState::Submitting;
        match self.api.add_follower(email.as_ref()).await {
            Ok(response) => {
                self.displayed_count = Some(response.count);
                if response.success {
                    self.state = FollowState::Done;
                    Ok(response.count)
                } else {
                    self.state = FollowState::AlreadyMember;
                    Err(WidgetError::AlreadyMember)
                }
            }
            Err(err) => {
                warn!("follow submission failed: {err}");
                self.state = FollowState::Verified;
                Err(err.into())
            }
        }
    }

    /// Submits, holds `Done` for the reset delay, then returns to `Unverified`.
    /// Failures leave the state where [`FollowWidget::submit`] put it.
    pub async fn submit_and_reset(&mut self) -> Result<u64, WidgetError> {
        let count = self.submit().await?;
        self.finish().await?;
        Ok(count)
    }

    /// Waits out the success display, then resets for the next visitor.
    pub async fn finish(&mut self) -> Result<(), WidgetError> {
        self.expect_state(FollowState::Done, "finish")?;
        tokio::time::sleep(self.timings.reset_delay).await;
        self.reset()
    }

    /// `Done` back to `Unverified`.
    pub fn reset(&mut self) -> Result<(), WidgetError> {
        self.expect_state(FollowState::Done, "reset")?;
        self.clear();
        Ok(())
    }

    /// Starts over from any state, including `AlreadyMember`.
    pub fn new_session(&mut self) {
        self.clear();
    }

    fn clear(&mut self) {
        self.state = FollowState::Unverified;
        self.email = None;
    }

    fn expect_state(&self, expected: FollowState, action: &'static str) -> Result<(), WidgetError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(WidgetError::InvalidTransition {
                action,
                state: self.state,
            })
        }
    }
}

/// Validates the contact form locally, then posts it.
pub async fn submit_contact<A: TribeApi>(
    api: &A,
    form: &ContactRequest,
) -> Result<ContactResponse, WidgetError> {
    ContactSubmission::parse(form).map_err(|err| WidgetError::Invalid(err.to_string()))?;
    Ok(api.submit_contact(form).await?)
}
