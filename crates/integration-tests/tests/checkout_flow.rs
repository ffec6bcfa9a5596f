//! Checkout services driven end to end against the in-memory backend.

#![allow(clippy::unwrap_used)]

use kitabwale_core::checkout::{CheckoutError, CheckoutStep};
use kitabwale_core::models::PaymentProof;
use kitabwale_core::pricing::ShippingCharge;
use kitabwale_core::{PaymentId, PaymentSessionId, Price, ProductId};
use kitabwale_integration_tests::{FakeBackend, address, book, order_item_ids, payment_config};
use kitabwale_storefront::config::PaymentConfig;
use kitabwale_storefront::services::{
    AddressResolver, CartService, ChannelWidget, CheckoutService, OrderChange, OrderCoordinator,
    ProceedOutcome, Settlement, StoreContext, WidgetOutcome, WishlistChange, WishlistService,
};

fn proof(session: &PaymentSessionId) -> PaymentProof {
    PaymentProof {
        razorpay_order_id: session.clone(),
        razorpay_payment_id: PaymentId::new("pay_1"),
        razorpay_signature: "sig".to_string(),
    }
}

/// One book at 250 (cover 300, free shipping) in the cart, address a1 saved.
async fn setup() -> (FakeBackend, StoreContext) {
    let backend = FakeBackend::with_products(vec![book("p1", 300, 250, ShippingCharge::Free)]);
    backend.state().addresses.push(address("a1"));
    let mut ctx = backend.signed_in().await;
    CartService::new(&backend)
        .add(&mut ctx, &ProductId::new("p1"), 1)
        .await
        .unwrap();
    (backend, ctx)
}

/// Walk cart → address → payment and return the pending session id.
async fn reach_payment(
    backend: &FakeBackend,
    ctx: &mut StoreContext,
    payment: &PaymentConfig,
) -> PaymentSessionId {
    let checkout = CheckoutService::new(backend, payment);
    checkout.proceed(ctx).await.unwrap();
    AddressResolver::new(backend)
        .select_saved(ctx, &"a1".into())
        .await
        .unwrap();
    checkout.proceed(ctx).await.unwrap();
    match checkout.proceed(ctx).await.unwrap() {
        ProceedOutcome::OpenWidget(options) => options.order_id,
        ProceedOutcome::MovedTo(step) => panic!("expected widget, moved to {step}"),
    }
}

#[tokio::test]
async fn test_single_book_checkout_end_to_end() {
    let (backend, mut ctx) = setup().await;
    let payment = payment_config();
    let checkout = CheckoutService::new(&backend, &payment);

    assert_eq!(ctx.cart.summary().final_amount, Price::rupees(250));

    // Cart: the order is created from the cart snapshot
    let outcome = checkout.proceed(&mut ctx).await.unwrap();
    assert_eq!(outcome, ProceedOutcome::MovedTo(CheckoutStep::Address));
    {
        let state = backend.state();
        assert_eq!(state.created_orders.len(), 1);
        assert_eq!(state.created_orders[0].total_amount, Price::rupees(250));
        assert_eq!(order_item_ids(&state.created_orders[0].items), vec!["p1"]);
    }

    // Address: the order is patched before the selection is recorded
    AddressResolver::new(&backend)
        .select_saved(&mut ctx, &"a1".into())
        .await
        .unwrap();
    assert_eq!(ctx.checkout.shipping_address().map(|a| a.as_str()), Some("a1"));
    assert!(backend.state().patches[0].shipping_address.is_some());

    let outcome = checkout.proceed(&mut ctx).await.unwrap();
    assert_eq!(outcome, ProceedOutcome::MovedTo(CheckoutStep::Payment));

    // Payment: the widget runs on the other end of a channel
    let (widget, mut requests) = ChannelWidget::new(1);
    let host = tokio::spawn(async move {
        let request = requests.recv().await.unwrap();
        assert_eq!(request.options.amount, 25_000);
        assert_eq!(request.options.currency, "INR");
        let session = request.options.order_id.clone();
        request.respond(WidgetOutcome::Completed(proof(&session)));
    });

    let settlement = checkout.pay(&mut ctx, &widget).await.unwrap();
    host.await.unwrap();

    let order_id = match settlement {
        Settlement::Paid(order_id) => order_id,
        Settlement::Dismissed => panic!("payment was dismissed"),
    };
    assert!(ctx.cart.is_empty());
    assert_eq!(ctx.checkout.step(), CheckoutStep::Cart);
    assert!(ctx.checkout.order_id().is_none());

    let state = backend.state();
    let order = state.orders.iter().find(|o| o.id == order_id).unwrap();
    assert!(order.is_paid());
    assert!(order.shipping_address.is_some());
}

#[tokio::test]
async fn test_empty_cart_cannot_start_checkout() {
    let backend = FakeBackend::default();
    let mut ctx = backend.signed_in().await;
    let payment = payment_config();

    let err = CheckoutService::new(&backend, &payment)
        .proceed(&mut ctx)
        .await
        .unwrap_err();
    assert_eq!(err, CheckoutError::EmptyCart);
    assert!(backend.state().created_orders.is_empty());
}

#[tokio::test]
async fn test_rejected_order_creation_stays_at_cart() {
    let (backend, mut ctx) = setup().await;
    backend.state().reject_order_creation = true;
    let payment = payment_config();

    let err = CheckoutService::new(&backend, &payment)
        .proceed(&mut ctx)
        .await
        .unwrap_err();

    assert!(matches!(err, CheckoutError::OrderCreation(_)));
    assert_eq!(ctx.checkout.step(), CheckoutStep::Cart);
    assert!(ctx.checkout.order_id().is_none());
    assert!(!ctx.cart.is_empty());
}

#[tokio::test]
async fn test_rejected_address_patch_is_not_recorded() {
    let (backend, mut ctx) = setup().await;
    let payment = payment_config();
    let checkout = CheckoutService::new(&backend, &payment);
    checkout.proceed(&mut ctx).await.unwrap();
    backend.state().reject_address_patches = true;

    let err = AddressResolver::new(&backend)
        .select_saved(&mut ctx, &"a1".into())
        .await
        .unwrap_err();
    assert!(matches!(err, CheckoutError::OrderUpdate(_)));
    assert!(ctx.checkout.shipping_address().is_none());

    let err = checkout.proceed(&mut ctx).await.unwrap_err();
    assert_eq!(err, CheckoutError::MissingAddress);
    assert_eq!(ctx.checkout.step(), CheckoutStep::Address);
}

#[tokio::test]
async fn test_payment_step_requires_address() {
    let (backend, mut ctx) = setup().await;
    let payment = payment_config();
    let checkout = CheckoutService::new(&backend, &payment);

    checkout.proceed(&mut ctx).await.unwrap();
    let err = checkout.proceed(&mut ctx).await.unwrap_err();

    assert_eq!(err, CheckoutError::MissingAddress);
    assert_eq!(ctx.checkout.step(), CheckoutStep::Address);
}

#[tokio::test]
async fn test_dismissed_widget_keeps_payment_step() {
    let (backend, mut ctx) = setup().await;
    let payment = payment_config();
    reach_payment(&backend, &mut ctx, &payment).await;

    let settlement = CheckoutService::new(&backend, &payment)
        .settle_payment(&mut ctx, WidgetOutcome::Dismissed)
        .await
        .unwrap();

    assert_eq!(settlement, Settlement::Dismissed);
    assert_eq!(ctx.checkout.step(), CheckoutStep::Payment);
    assert!(ctx.checkout.pending_payment().is_none());
    assert!(!ctx.cart.is_empty());
}

#[tokio::test]
async fn test_host_dropping_request_counts_as_dismissal() {
    let (backend, mut ctx) = setup().await;
    let payment = payment_config();
    reach_payment(&backend, &mut ctx, &payment).await;
    let checkout = CheckoutService::new(&backend, &payment);

    let (widget, mut requests) = ChannelWidget::new(1);
    let host = tokio::spawn(async move {
        drop(requests.recv().await);
    });

    let settlement = checkout.pay(&mut ctx, &widget).await.unwrap();
    host.await.unwrap();
    assert_eq!(settlement, Settlement::Dismissed);
}

#[tokio::test]
async fn test_duplicate_callback_is_rejected() {
    let (backend, mut ctx) = setup().await;
    let payment = payment_config();
    let session = reach_payment(&backend, &mut ctx, &payment).await;
    let checkout = CheckoutService::new(&backend, &payment);

    let first = checkout
        .settle_payment(&mut ctx, WidgetOutcome::Completed(proof(&session)))
        .await
        .unwrap();
    assert!(matches!(first, Settlement::Paid(_)));
    let patches = backend.state().patches.len();

    let second = checkout
        .settle_payment(&mut ctx, WidgetOutcome::Completed(proof(&session)))
        .await;
    assert!(second.is_err());
    assert_eq!(backend.state().patches.len(), patches);
}

#[tokio::test]
async fn test_stale_session_never_reaches_the_order() {
    let (backend, mut ctx) = setup().await;
    let payment = payment_config();
    reach_payment(&backend, &mut ctx, &payment).await;
    let patches = backend.state().patches.len();

    let err = CheckoutService::new(&backend, &payment)
        .settle_payment(
            &mut ctx,
            WidgetOutcome::Completed(proof(&PaymentSessionId::new("order_rzp_old"))),
        )
        .await
        .unwrap_err();

    assert_eq!(err, CheckoutError::UnknownPaymentSession);
    assert_eq!(backend.state().patches.len(), patches);
    assert_eq!(ctx.checkout.step(), CheckoutStep::Payment);
}

#[tokio::test]
async fn test_failed_confirmation_keeps_cart_and_can_be_resent() {
    let (backend, mut ctx) = setup().await;
    let payment = payment_config();
    let session = reach_payment(&backend, &mut ctx, &payment).await;
    backend.state().reject_payment_patches = 1;
    let checkout = CheckoutService::new(&backend, &payment);

    let err = checkout
        .settle_payment(&mut ctx, WidgetOutcome::Completed(proof(&session)))
        .await
        .unwrap_err();
    let order_id = match err {
        CheckoutError::FinalizationFailed { order_id, .. } => order_id,
        other => panic!("unexpected error: {other}"),
    };
    assert!(!ctx.cart.is_empty());
    let unconfirmed = ctx.checkout.unconfirmed_payment().unwrap();
    assert_eq!(unconfirmed.order_id, order_id);
    assert_eq!(unconfirmed.proof.razorpay_order_id, session);

    // Proceeding again must not open a second charge
    let err = checkout.proceed(&mut ctx).await.unwrap_err();
    assert!(matches!(err, CheckoutError::FinalizationFailed { .. }));
    assert_eq!(backend.state().payment_sessions.len(), 1);

    let settlement = checkout.confirm_again(&mut ctx).await.unwrap();
    assert_eq!(settlement, Settlement::Paid(order_id));
    assert!(ctx.cart.is_empty());
    assert!(ctx.checkout.unconfirmed_payment().is_none());
}

#[tokio::test]
async fn test_payment_session_failure_stays_on_payment() {
    let (backend, mut ctx) = setup().await;
    let payment = payment_config();
    let checkout = CheckoutService::new(&backend, &payment);
    checkout.proceed(&mut ctx).await.unwrap();
    AddressResolver::new(&backend)
        .select_saved(&mut ctx, &"a1".into())
        .await
        .unwrap();
    checkout.proceed(&mut ctx).await.unwrap();
    backend.state().reject_payment_sessions = true;

    let err = checkout.proceed(&mut ctx).await.unwrap_err();

    assert!(matches!(err, CheckoutError::PaymentInit(_)));
    assert_eq!(ctx.checkout.step(), CheckoutStep::Payment);
    assert!(ctx.checkout.pending_payment().is_none());
}

#[tokio::test]
async fn test_cart_change_restarts_checkout() {
    let (backend, mut ctx) = setup().await;
    backend
        .state()
        .products
        .push(book("p2", 500, 390, ShippingCharge::Amount(Price::rupees(40))));
    let payment = payment_config();
    CheckoutService::new(&backend, &payment)
        .proceed(&mut ctx)
        .await
        .unwrap();
    assert_eq!(ctx.checkout.step(), CheckoutStep::Address);

    CartService::new(&backend)
        .add(&mut ctx, &ProductId::new("p2"), 1)
        .await
        .unwrap();

    assert_eq!(ctx.checkout.step(), CheckoutStep::Cart);
    assert!(ctx.checkout.order_id().is_none());
    // 250 + 390 + highest shipping (40)
    assert_eq!(ctx.cart.summary().final_amount, Price::rupees(680));
}

#[tokio::test]
async fn test_unknown_address_is_rejected() {
    let (backend, mut ctx) = setup().await;
    let payment = payment_config();
    CheckoutService::new(&backend, &payment)
        .proceed(&mut ctx)
        .await
        .unwrap();

    let err = AddressResolver::new(&backend)
        .select_saved(&mut ctx, &"missing".into())
        .await
        .unwrap_err();

    assert_eq!(err, CheckoutError::MissingAddress);
    assert!(ctx.checkout.shipping_address().is_none());
}

#[tokio::test]
async fn test_coordinator_needs_an_order_to_patch() {
    let (backend, mut ctx) = setup().await;

    let err = OrderCoordinator::new(&backend)
        .create_or_update(&mut ctx, Some(OrderChange::ShippingAddress(address("a1"))))
        .await
        .unwrap_err();
    assert_eq!(err, CheckoutError::NoActiveOrder);

    let order = OrderCoordinator::new(&backend)
        .create_or_update(&mut ctx, None)
        .await
        .unwrap();
    assert_eq!(ctx.checkout.order_id(), Some(&order.id));

    // With an order and no change the current order is re-read
    let again = OrderCoordinator::new(&backend)
        .create_or_update(&mut ctx, None)
        .await
        .unwrap();
    assert_eq!(again.id, order.id);
    assert_eq!(backend.state().created_orders.len(), 1);
}

#[tokio::test]
async fn test_removing_absent_wishlist_entry_is_a_no_op() {
    let backend = FakeBackend::with_products(vec![book("p1", 300, 250, ShippingCharge::Free)]);
    let mut ctx = backend.signed_in().await;
    let wishlist = WishlistService::new(&backend);

    let change = wishlist
        .remove(&mut ctx, &ProductId::new("p1"))
        .await
        .unwrap();
    assert_eq!(change, WishlistChange::Unchanged);
    assert_eq!(backend.state().wishlist_removals, 0);

    assert_eq!(
        wishlist.toggle(&mut ctx, &ProductId::new("p1")).await.unwrap(),
        WishlistChange::Added
    );
    assert!(ctx.wishlist.contains(&ProductId::new("p1")));
    assert_eq!(
        wishlist.toggle(&mut ctx, &ProductId::new("p1")).await.unwrap(),
        WishlistChange::Removed
    );
    assert_eq!(backend.state().wishlist_removals, 1);
    assert!(ctx.wishlist.is_empty());
}

#[tokio::test]
async fn test_signed_out_context_cannot_mutate_cart() {
    let backend = FakeBackend::with_products(vec![book("p1", 300, 250, ShippingCharge::Free)]);
    let mut ctx = StoreContext::new();

    let err = CartService::new(&backend)
        .add(&mut ctx, &ProductId::new("p1"), 1)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        kitabwale_storefront::backend::BackendError::Unauthorized(_)
    ));
    assert!(backend.state().cart.is_empty());
}
