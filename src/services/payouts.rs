//! Payout workflow
//!
//! A returned rental is paid out to its lender at most once. The payout
//! agent moves the money and records the payment; the server checks the
//! preconditions, calls it and closes the rental.

use rust_decimal::Decimal;

use crate::{
    agents::{AgentError, AgentName, AgentRegistry},
    error::{AppError, AppResult},
    models::{PayoutCommand, PayoutInstruction, PayoutReceipt, PayoutRequest, RentalStatus, Session},
    repository::Repository,
    services::events::RentalEvents,
};

#[derive(Clone)]
pub struct PayoutService {
    repository: Repository,
    agents: AgentRegistry,
    events: RentalEvents,
}

impl PayoutService {
    pub fn new(repository: Repository, agents: AgentRegistry, events: RentalEvents) -> Self {
        Self {
            repository,
            agents,
            events,
        }
    }

    /// Validate a payout request made by `session` and settle it
    pub async fn request_payout(
        &self,
        session: &Session,
        request: PayoutRequest,
    ) -> AppResult<PayoutReceipt> {
        let command = request.into_command().map_err(AppError::MissingFields)?;
        if command.user_id != session.user_id {
            return Err(AppError::Forbidden(
                "Payouts can only be requested by the lender being paid".to_string(),
            ));
        }
        self.settle(command).await
    }

    /// Pay the lender of a returned rental.
    ///
    /// The agent is never called for a rental that already has a completed
    /// payment.
    pub async fn settle(&self, command: PayoutCommand) -> AppResult<PayoutReceipt> {
        let instruction = PayoutInstruction::from(&command);
        let PayoutCommand {
            rental_id,
            user_id,
            amount,
        } = command;

        if amount <= Decimal::ZERO {
            return Err(AppError::Validation(format!(
                "Payout amount must be positive, got {}",
                amount
            )));
        }

        if let Some(payment) = self.repository.payments.find_completed(rental_id).await? {
            tracing::info!(
                "Payout for rental {} refused: payment {} already completed",
                rental_id,
                payment.payment_id
            );
            return Err(AppError::AlreadyPaid(rental_id));
        }

        let rental = self.repository.rentals.get(rental_id).await?;
        match rental.status {
            RentalStatus::Returned => {}
            RentalStatus::Completed => return Err(AppError::AlreadyPaid(rental_id)),
            other => {
                return Err(AppError::InvalidState {
                    rental_id,
                    status: other.to_string(),
                    action: "paid out",
                })
            }
        }
        if rental.lender_id != user_id {
            return Err(AppError::Forbidden(format!(
                "User {} is not the lender of rental {}",
                user_id, rental_id
            )));
        }
        let owed = rental.amount_owed();
        if amount > owed {
            return Err(AppError::Validation(format!(
                "Payout of {} exceeds the {} owed for rental {}",
                amount, owed, rental_id
            )));
        }

        let payload = serde_json::to_value(&instruction)
            .map_err(|e| AppError::Internal(format!("Unencodable payout {}: {}", amount, e)))?;
        let answer = self
            .agents
            .invoke(AgentName::Payout, payload)
            .await
            .map_err(AppError::PayoutAgentFailed)?;

        let receipt: PayoutReceipt = serde_json::from_value(answer).map_err(|e| {
            AppError::PayoutAgentFailed(AgentError::InvalidResponse {
                agent: AgentName::Payout.to_string(),
                reason: e.to_string(),
            })
        })?;

        if !receipt.is_completed() {
            tracing::warn!(
                "Payout {} for rental {} ended as {}",
                receipt.payment_id,
                rental_id,
                receipt.status
            );
            return Err(AppError::PayoutIncomplete(receipt.status));
        }

        match self
            .repository
            .rentals
            .transition(rental_id, &[RentalStatus::Returned], RentalStatus::Completed)
            .await
        {
            Ok(Some(completed)) => self.events.publish(&completed),
            Ok(None) => tracing::warn!(
                "Rental {} left returned state during payout {}",
                rental_id,
                receipt.payment_id
            ),
            Err(e) => tracing::error!(
                "Payout {} completed but rental {} not closed: {}",
                receipt.payment_id,
                rental_id,
                e
            ),
        }

        tracing::info!(
            "Payout {} of {} completed for rental {}",
            receipt.payment_id,
            amount,
            rental_id
        );
        Ok(receipt)
    }
}
