//! Request handler definitions
//!
//! Define each route and it handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will cause the
//! current worker to stop processing new requests:
//! ```nocompile
//!     fn my_handler() -> impl Responder {
//!         std::thread::sleep(Duration::from_secs(5)); // <-- Bad practice! Will cause the current worker thread to
//! hang!
//!     }
//! ```
//! For this reason, any long, non-cpu-bound operation (e.g. I/O, database operations, etc.) should be expressed as
//! futures or asynchronous functions. Async handlers get executed concurrently by worker threads and thus don’t block
//! execution:
//!
//! ```nocompile
//!     async fn my_handler() -> impl Responder {
//!         tokio::time::sleep(Duration::from_secs(5)).await; // <-- Ok. Worker thread will handle other requests here
//!     }
//! ```
use actix_web::{get, web, HttpRequest, HttpResponse, Responder};
use lcm_order_engine::{
    db_types::{OrderId, RefundStatus},
    order_objects::{CancelRequest, CheckoutRequest},
    traits::{CancellationManagement, OrderManagement, PaymentGateway, PaymentStore},
    CancellationApi,
    CheckoutApi,
    OrderAdminApi,
    PaymentFlowApi,
};
use log::*;

use crate::{
    data_objects::{
        CancelOrderRequest,
        CancelOrderResponse,
        CancellableResponse,
        JsonResponse,
        PaymentVerificationRequest,
        PaymentVerificationResponse,
        ReconcileRefundRequest,
        UpdateStatusRequest,
        UserQuery,
        WebhookNotification,
    },
    errors::ServerError,
    helpers::{acting_user, require_user_id, user_id, GUEST_USER},
};

const DEFAULT_RECONCILE_NOTE: &str = "Settled out-of-band by an administrator";

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($param:ident: $first:ident $(+ $rest:ident)*),+) => {
        paste::paste! { pub struct [<$name:camel Route>]<$($param),+>(core::marker::PhantomData<fn() -> ($($param,)+)>);}
        paste::paste! { impl<$($param),+> [<$name:camel Route>]<$($param),+> {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self(core::marker::PhantomData)
            }
        }}
        paste::paste! { impl<$($param),+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$($param),+>
        where
            $($param: $first $(+ $rest)* + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::<$($param),+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Checkout  ----------------------------------------------------
route!(checkout => Post "/orders/checkout" impl B: OrderManagement, G: PaymentGateway);
/// Route handler for the checkout endpoint
///
/// Turns the signed-in user's cart snapshot into a `PENDING` order. The response carries the order id that the
/// storefront hands to the payment gateway as `merchant_uid`.
pub async fn checkout<B, G>(
    req: HttpRequest,
    body: web::Json<CheckoutRequest>,
    api: web::Data<CheckoutApi<B, G>>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderManagement,
    G: PaymentGateway,
{
    let user = require_user_id(&req)?;
    debug!("💻️ POST checkout for {user}");
    let order = api.checkout(&user, body.into_inner()).await?;
    Ok(HttpResponse::Created().json(order))
}

//----------------------------------------------   Payments  ----------------------------------------------------
route!(verify_payment => Post "/payments/verify" impl B: OrderManagement + PaymentStore + CancellationManagement, G: PaymentGateway);
/// Route handler for client-side payment verification
///
/// The storefront calls this once the gateway's checkout widget reports success. The gateway is asked for its own
/// record of the transaction; nothing in the request body is trusted beyond the two ids. Verifying the same
/// transaction again returns the stored payment with `alreadyProcessed` set.
pub async fn verify_payment<B, G>(
    req: HttpRequest,
    body: web::Json<PaymentVerificationRequest>,
    api: web::Data<PaymentFlowApi<B, G>>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderManagement + PaymentStore + CancellationManagement,
    G: PaymentGateway,
{
    let user = user_id(&req).unwrap_or_else(|| GUEST_USER.to_string());
    let PaymentVerificationRequest { imp_uid, merchant_uid } = body.into_inner();
    debug!("💻️ POST verify payment {imp_uid} for order {merchant_uid} by {user}");
    let result = api.verify(&imp_uid, &merchant_uid, &user).await?;
    Ok(HttpResponse::Ok().json(PaymentVerificationResponse::from(result)))
}

route!(payment_webhook => Post "" impl B: OrderManagement + PaymentStore + CancellationManagement, G: PaymentGateway);
/// Route handler for the gateway's payment notification
///
/// Runs the same verification as [`verify_payment`]. Business failures are answered with 200 and
/// `{"success": false}` so that the gateway does not redeliver them. Only failures that may succeed on a second
/// attempt are answered with 503.
///
/// The gateway also notifies about transactions that are `ready`, `failed` or `cancelled`. Those are acknowledged
/// without verification. A notification without a status is verified.
pub async fn payment_webhook<B, G>(body: web::Json<WebhookNotification>, api: web::Data<PaymentFlowApi<B, G>>) -> HttpResponse
where
    B: OrderManagement + PaymentStore + CancellationManagement,
    G: PaymentGateway,
{
    let WebhookNotification { imp_uid, merchant_uid, status } = body.into_inner();
    info!("💻️ Payment webhook for {imp_uid} (order {merchant_uid}). Reported status: {status:?}");
    if let Some(status) = status.as_deref().filter(|s| !s.trim().eq_ignore_ascii_case("paid")) {
        debug!("💻️ Webhook for {imp_uid} reports '{status}'. Nothing to verify");
        return HttpResponse::Ok().json(JsonResponse::success(format!("Notification for a {status} transaction ignored")));
    }
    match api.verify(&imp_uid, &merchant_uid, GUEST_USER).await {
        Ok(result) => {
            info!("💻️ Webhook verified payment {} ({:?})", result.payment.payment_id, result.outcome);
            HttpResponse::Ok().json(JsonResponse::success(result.payment.payment_id))
        },
        Err(e) if e.is_retryable() => {
            warn!("💻️ Webhook for {imp_uid} could not be processed now. The gateway will retry. {e}");
            HttpResponse::ServiceUnavailable().json(JsonResponse::failure(e))
        },
        Err(e) => {
            warn!("💻️ Webhook for {imp_uid} was not accepted. {e}");
            HttpResponse::Ok().json(JsonResponse::failure(e))
        },
    }
}

route!(payment_by_id => Get "/payments/{payment_id}" impl B: OrderManagement + PaymentStore + CancellationManagement, G: PaymentGateway);
pub async fn payment_by_id<B, G>(
    path: web::Path<String>,
    api: web::Data<PaymentFlowApi<B, G>>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderManagement + PaymentStore + CancellationManagement,
    G: PaymentGateway,
{
    let payment_id = path.into_inner();
    debug!("💻️ GET payment {payment_id}");
    let payment = api.fetch_payment(&payment_id).await?;
    Ok(HttpResponse::Ok().json(payment))
}

//----------------------------------------------   Orders  ----------------------------------------------------
route!(my_orders => Get "/orders" impl B: OrderManagement);
/// Route handler for the orders endpoint
///
/// Returns the signed-in user's orders, newest first. A `userId` query parameter is accepted for compatibility, but it
/// must name the signed-in user.
pub async fn my_orders<B: OrderManagement>(
    req: HttpRequest,
    query: web::Query<UserQuery>,
    api: web::Data<OrderAdminApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let user = acting_user(&req, query.user_id.as_deref())?;
    debug!("💻️ GET orders for {user}");
    let orders = api.orders_for_user(&user).await?;
    Ok(HttpResponse::Ok().json(orders))
}

route!(order_by_id => Get "/orders/{order_id}" impl B: OrderManagement);
pub async fn order_by_id<B: OrderManagement>(
    req: HttpRequest,
    path: web::Path<String>,
    api: web::Data<OrderAdminApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let user = require_user_id(&req)?;
    let order_id = OrderId::from(path.into_inner());
    debug!("💻️ GET order {order_id} for {user}");
    let order = api.order_for_user(&order_id, &user).await?;
    Ok(HttpResponse::Ok().json(order))
}

//----------------------------------------------   Cancellation  ----------------------------------------------------
route!(cancel_order => Post "/orders/{order_id}/cancel" impl B: OrderManagement + PaymentStore + CancellationManagement, G: PaymentGateway);
/// Route handler for the cancellation endpoint
///
/// Runs the cancellation saga for the signed-in user's order. If the order was paid, the payment is refunded at the
/// gateway, in full unless `refundAmount` says otherwise. A refund that fails does not fail the request: the order is
/// cancelled and the response reports `refundStatus: FAILED`.
pub async fn cancel_order<B, G>(
    req: HttpRequest,
    path: web::Path<String>,
    body: web::Json<CancelOrderRequest>,
    api: web::Data<CancellationApi<B, G>>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderManagement + PaymentStore + CancellationManagement,
    G: PaymentGateway,
{
    let order_id = OrderId::from(path.into_inner());
    let body = body.into_inner();
    let user = acting_user(&req, body.user_id.as_deref())?;
    debug!("💻️ POST cancel order {order_id} for {user}");
    let mut request = CancelRequest::new(order_id, &user, body.reason);
    if let Some(amount) = body.refund_amount {
        request = request.with_refund_amount(amount);
    }
    if let Some(payment_id) = body.payment_id {
        request = request.with_payment_id(payment_id);
    }
    let result = api.cancel_order(request).await?;
    Ok(HttpResponse::Ok().json(CancelOrderResponse::from(result)))
}

route!(cancel_record => Get "/orders/{order_id}/cancel" impl B: OrderManagement + PaymentStore + CancellationManagement, G: PaymentGateway);
pub async fn cancel_record<B, G>(
    req: HttpRequest,
    path: web::Path<String>,
    api: web::Data<CancellationApi<B, G>>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderManagement + PaymentStore + CancellationManagement,
    G: PaymentGateway,
{
    let user = require_user_id(&req)?;
    let order_id = OrderId::from(path.into_inner());
    debug!("💻️ GET cancellation of order {order_id} for {user}");
    let cancel = api.cancel_for_order(&order_id, &user).await?;
    Ok(HttpResponse::Ok().json(cancel))
}

route!(cancelable => Get "/orders/{order_id}/cancelable" impl B: OrderManagement + PaymentStore + CancellationManagement, G: PaymentGateway);
/// Evaluates the cancellation preconditions without cancelling anything.
pub async fn cancelable<B, G>(
    req: HttpRequest,
    path: web::Path<String>,
    query: web::Query<UserQuery>,
    api: web::Data<CancellationApi<B, G>>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderManagement + PaymentStore + CancellationManagement,
    G: PaymentGateway,
{
    let user = acting_user(&req, query.user_id.as_deref())?;
    let order_id = OrderId::from(path.into_inner());
    let cancelable = api.is_cancellable(&order_id, &user).await?;
    trace!("💻️ Order {order_id} cancelable: {cancelable}");
    Ok(HttpResponse::Ok().json(CancellableResponse { order_id, cancelable }))
}

route!(cancelled_orders => Get "/orders/cancelled" impl B: OrderManagement + PaymentStore + CancellationManagement, G: PaymentGateway);
pub async fn cancelled_orders<B, G>(
    req: HttpRequest,
    query: web::Query<UserQuery>,
    api: web::Data<CancellationApi<B, G>>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderManagement + PaymentStore + CancellationManagement,
    G: PaymentGateway,
{
    let user = acting_user(&req, query.user_id.as_deref())?;
    debug!("💻️ GET cancellations for {user}");
    let cancels = api.cancels_for_user(&user).await?;
    Ok(HttpResponse::Ok().json(cancels))
}

//----------------------------------------------   Admin  ----------------------------------------------------
route!(update_order_status => Put "/admin/orders/{order_id}/status" impl B: OrderManagement);
/// Moves an order forward through fulfilment. Cancellations must go through the cancellation endpoints.
pub async fn update_order_status<B: OrderManagement>(
    path: web::Path<String>,
    body: web::Json<UpdateStatusRequest>,
    api: web::Data<OrderAdminApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = OrderId::from(path.into_inner());
    let status = body.into_inner().status;
    info!("💻️ PUT status of order {order_id} to {status}");
    let order = api.update_status(&order_id, status).await?;
    Ok(HttpResponse::Ok().json(order))
}

route!(member_withdrawal => Post "/admin/users/{user_id}/withdrawal" impl B: OrderManagement + PaymentStore + CancellationManagement, G: PaymentGateway);
/// Cancels or marks every order of a withdrawing member. Failures on one order do not stop the others; they are
/// listed in the summary.
pub async fn member_withdrawal<B, G>(
    path: web::Path<String>,
    api: web::Data<CancellationApi<B, G>>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderManagement + PaymentStore + CancellationManagement,
    G: PaymentGateway,
{
    let user = path.into_inner();
    info!("💻️ POST withdrawal of member {user}");
    let summary = api.withdraw_member(&user).await?;
    if summary.failures() > 0 {
        warn!("💻️ Withdrawal of {user} left {} order(s) needing attention", summary.failures());
    }
    Ok(HttpResponse::Ok().json(summary))
}

route!(order_audit => Get "/admin/orders/{order_id}/audit" impl B: OrderManagement + PaymentStore + CancellationManagement, G: PaymentGateway);
/// The order's payment audit trail: amount mismatches, refunds issued or failed by verification, and refund
/// reconciliations.
pub async fn order_audit<B, G>(
    path: web::Path<String>,
    api: web::Data<PaymentFlowApi<B, G>>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderManagement + PaymentStore + CancellationManagement,
    G: PaymentGateway,
{
    let order_id = OrderId::from(path.into_inner());
    debug!("💻️ GET audit trail for order {order_id}");
    let entries = api.audit_trail(&order_id).await?;
    Ok(HttpResponse::Ok().json(entries))
}

route!(failed_refunds => Get "/admin/refunds/failed" impl B: OrderManagement + PaymentStore + CancellationManagement, G: PaymentGateway);
pub async fn failed_refunds<B, G>(api: web::Data<CancellationApi<B, G>>) -> Result<HttpResponse, ServerError>
where
    B: OrderManagement + PaymentStore + CancellationManagement,
    G: PaymentGateway,
{
    debug!("💻️ GET failed refunds");
    let cancels = api.failed_refunds().await?;
    Ok(HttpResponse::Ok().json(cancels))
}

route!(reconcile_refund => Put "/admin/refunds/{order_id}" impl B: OrderManagement + PaymentStore + CancellationManagement, G: PaymentGateway);
/// Records that a failed refund was settled outside the system. Only `FAILED` → `COMPLETED` is accepted.
pub async fn reconcile_refund<B, G>(
    path: web::Path<String>,
    body: web::Json<ReconcileRefundRequest>,
    api: web::Data<CancellationApi<B, G>>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderManagement + PaymentStore + CancellationManagement,
    G: PaymentGateway,
{
    let order_id = OrderId::from(path.into_inner());
    let ReconcileRefundRequest { refund_status, external_cancel_id, note } = body.into_inner();
    if refund_status != RefundStatus::Completed {
        return Err(ServerError::InvalidRequestBody(format!(
            "A failed refund can only be reconciled as {}",
            RefundStatus::Completed
        )));
    }
    info!("💻️ PUT reconcile refund for order {order_id}");
    let note = note.unwrap_or_else(|| DEFAULT_RECONCILE_NOTE.to_string());
    let cancel = api.reconcile_refund(&order_id, external_cancel_id, &note).await?;
    Ok(HttpResponse::Ok().json(cancel))
}
