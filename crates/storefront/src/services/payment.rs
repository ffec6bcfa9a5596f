//! Payment Initiator and the hosted payment widget boundary.
//!
//! The widget is an opaque asynchronous component: it is opened with a set
//! of [`WidgetOptions`] and eventually reports either the three correlation
//! fields of a successful payment or that the shopper closed it. The
//! [`PaymentWidget`] trait models that as a one-shot future.

use async_trait::async_trait;
use kitabwale_core::checkout::CheckoutError;
use kitabwale_core::models::{PaymentProof, PaymentSession};
use kitabwale_core::{OrderId, PaymentSessionId};
use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tracing::instrument;

use super::StoreContext;
use crate::backend::Backend;
use crate::config::PaymentConfig;
use crate::error::add_breadcrumb;

/// Shopper details the widget pre-fills.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Prefill {
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Theme {
    pub color: String,
}

/// Options the hosted widget is opened with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WidgetOptions {
    /// Publishable gateway key.
    pub key: String,
    /// Amount in paise.
    pub amount: u64,
    pub currency: String,
    pub name: String,
    pub description: String,
    /// Payment session id issued by the backend.
    pub order_id: PaymentSessionId,
    pub prefill: Prefill,
    pub theme: Theme,
}

impl WidgetOptions {
    /// JSON for embedding in a `<script type="application/json">` block.
    ///
    /// `<` is escaped so the payload can never close the script element.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_script_json(&self) -> Result<String, serde_json::Error> {
        Ok(serde_json::to_string(self)?.replace('<', "\\u003c"))
    }
}

/// How the widget was left.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WidgetOutcome {
    Completed(PaymentProof),
    Dismissed,
}

/// The hosted payment widget.
#[async_trait]
pub trait PaymentWidget: Send + Sync {
    /// Open the widget and wait until the shopper pays or closes it.
    async fn open(&self, options: WidgetOptions) -> WidgetOutcome;
}

/// Payment Initiator.
pub struct PaymentInitiator<'a> {
    backend: &'a dyn Backend,
    config: &'a PaymentConfig,
}

impl<'a> PaymentInitiator<'a> {
    #[must_use]
    pub const fn new(backend: &'a dyn Backend, config: &'a PaymentConfig) -> Self {
        Self { backend, config }
    }

    /// Request a payment session for `order_id` and build widget options.
    ///
    /// The session id is remembered as the pending payment so only a
    /// completion for this session is accepted later.
    ///
    /// # Errors
    ///
    /// [`CheckoutError::PaymentInit`] if no session can be obtained. The
    /// checkout stays at the payment step.
    #[instrument(skip(self, ctx), fields(order_id = %order_id))]
    pub async fn initiate(
        &self,
        ctx: &mut StoreContext,
        order_id: &OrderId,
    ) -> Result<WidgetOptions, CheckoutError> {
        let credential = ctx
            .credential()
            .map_err(|e| CheckoutError::PaymentInit(e.user_message().to_string()))?;
        let session = self
            .backend
            .create_payment_session(&credential, order_id)
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "Payment session request failed");
                CheckoutError::PaymentInit(e.user_message().to_string())
            })?;

        ctx.checkout.payment_started(session.id.clone());
        add_breadcrumb(
            "checkout",
            "Payment session created",
            Some(&[("session_id", session.id.as_str())]),
        );
        Ok(self.widget_options(ctx, order_id, session))
    }

    fn widget_options(
        &self,
        ctx: &StoreContext,
        order_id: &OrderId,
        session: PaymentSession,
    ) -> WidgetOptions {
        let prefill = ctx
            .user()
            .map(|user| Prefill {
                name: user.name.clone(),
                email: user.email.clone(),
                contact: user.phone_number.clone(),
            })
            .unwrap_or_default();

        WidgetOptions {
            key: self.config.key_id.clone(),
            amount: session.amount,
            currency: session.currency,
            name: self.config.merchant_name.clone(),
            description: format!("Order {order_id}"),
            order_id: session.id,
            prefill,
            theme: Theme {
                color: self.config.theme_color.clone(),
            },
        }
    }
}

/// A request to open the widget, delivered to whoever hosts it.
#[derive(Debug)]
pub struct WidgetRequest {
    pub options: WidgetOptions,
    respond_to: oneshot::Sender<WidgetOutcome>,
}

impl WidgetRequest {
    /// Report how the widget was left.
    pub fn respond(self, outcome: WidgetOutcome) {
        // The opener may have stopped waiting.
        let _ = self.respond_to.send(outcome);
    }
}

/// A [`PaymentWidget`] hosted on the other end of a channel.
///
/// Each `open` sends a [`WidgetRequest`] and awaits its one-shot reply.
/// A host that goes away without answering counts as a dismissal.
#[derive(Debug, Clone)]
pub struct ChannelWidget {
    sender: mpsc::Sender<WidgetRequest>,
}

impl ChannelWidget {
    /// Create a widget and the receiver its host reads requests from.
    #[must_use]
    pub fn new(buffer: usize) -> (Self, mpsc::Receiver<WidgetRequest>) {
        let (sender, receiver) = mpsc::channel(buffer.max(1));
        (Self { sender }, receiver)
    }
}

#[async_trait]
impl PaymentWidget for ChannelWidget {
    async fn open(&self, options: WidgetOptions) -> WidgetOutcome {
        let (respond_to, response) = oneshot::channel();
        if self
            .sender
            .send(WidgetRequest {
                options,
                respond_to,
            })
            .await
            .is_err()
        {
            return WidgetOutcome::Dismissed;
        }
        response.await.unwrap_or(WidgetOutcome::Dismissed)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use kitabwale_core::PaymentId;

    fn options() -> WidgetOptions {
        WidgetOptions {
            key: "rzp_test_key".to_string(),
            amount: 25_000,
            currency: "INR".to_string(),
            name: "KitabWale".to_string(),
            description: "Order o1".to_string(),
            order_id: PaymentSessionId::new("order_rzp_1"),
            prefill: Prefill::default(),
            theme: Theme {
                color: "#3399cc".to_string(),
            },
        }
    }

    #[test]
    fn test_script_json_escapes_angle_brackets() {
        let mut opts = options();
        opts.name = "</script><script>alert(1)".to_string();
        let json = opts.to_script_json().unwrap();
        assert!(!json.contains('<'));
        assert!(json.contains("\\u003c/script>"));
    }

    #[test]
    fn test_options_serialize_widget_fields() {
        let value = serde_json::to_value(options()).unwrap();
        assert_eq!(value["key"], "rzp_test_key");
        assert_eq!(value["amount"], 25_000);
        assert_eq!(value["order_id"], "order_rzp_1");
        assert_eq!(value["theme"]["color"], "#3399cc");
        assert!(value["prefill"].get("contact").is_none());
    }

    #[tokio::test]
    async fn test_channel_widget_relays_completion() {
        let (widget, mut requests) = ChannelWidget::new(1);
        let host = tokio::spawn(async move {
            let request = requests.recv().await.unwrap();
            let session = request.options.order_id.clone();
            request.respond(WidgetOutcome::Completed(PaymentProof {
                razorpay_order_id: session,
                razorpay_payment_id: PaymentId::new("pay_1"),
                razorpay_signature: "sig".to_string(),
            }));
        });

        let outcome = widget.open(options()).await;
        host.await.unwrap();
        assert!(matches!(
            outcome,
            WidgetOutcome::Completed(proof) if proof.razorpay_order_id.as_str() == "order_rzp_1"
        ));
    }

    #[tokio::test]
    async fn test_channel_widget_without_host_is_dismissed() {
        let (widget, requests) = ChannelWidget::new(1);
        drop(requests);
        assert_eq!(widget.open(options()).await, WidgetOutcome::Dismissed);
    }

    #[tokio::test]
    async fn test_dropped_request_is_dismissed() {
        let (widget, mut requests) = ChannelWidget::new(1);
        let host = tokio::spawn(async move {
            let request = requests.recv().await.unwrap();
            drop(request);
        });
        assert_eq!(widget.open(options()).await, WidgetOutcome::Dismissed);
        host.await.unwrap();
    }
}
