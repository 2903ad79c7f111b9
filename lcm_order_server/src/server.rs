use std::time::Duration;

use actix_web::{
    dev::{Server, Service},
    http::KeepAlive,
    middleware::Logger,
    web,
    App,
    HttpServer,
};
use futures::{future::ok, FutureExt};
use lcm_order_engine::{CancellationApi, CheckoutApi, OrderAdminApi, PaymentFlowApi, SqliteDatabase};
use log::*;

use crate::{
    config::ServerConfig,
    errors::ServerError,
    helpers::get_remote_ip,
    integrations::iamport::IamportGateway,
    routes::{
        health,
        CancelOrderRoute,
        CancelRecordRoute,
        CancelableRoute,
        CancelledOrdersRoute,
        CheckoutRoute,
        FailedRefundsRoute,
        MemberWithdrawalRoute,
        MyOrdersRoute,
        OrderAuditRoute,
        OrderByIdRoute,
        PaymentByIdRoute,
        PaymentWebhookRoute,
        ReconcileRefundRoute,
        UpdateOrderStatusRoute,
        VerifyPaymentRoute,
    },
};

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    db.migrate().await.map_err(|e| ServerError::InitializeError(format!("Could not run migrations. {e}")))?;
    info!("🗃️ Database {} is ready", config.database_url);
    let gateway =
        IamportGateway::new(config.iamport.clone()).map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let srv = create_server_instance(config, db, gateway)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    gateway: IamportGateway,
) -> Result<Server, ServerError> {
    let bind_addr = (config.host.clone(), config.port);
    let srv = HttpServer::new(move || {
        let checkout_api = CheckoutApi::new(db.clone(), gateway.clone());
        let payments_api = PaymentFlowApi::new(db.clone(), gateway.clone());
        let cancel_api = CancellationApi::new(db.clone(), gateway.clone());
        let admin_api = OrderAdminApi::new(db.clone());
        let app = App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("lcm::access_log"))
            .app_data(web::Data::new(checkout_api))
            .app_data(web::Data::new(payments_api))
            .app_data(web::Data::new(cancel_api))
            .app_data(web::Data::new(admin_api));
        let proxy = config.proxy_config();
        let whitelist = config.webhook_whitelist.clone();
        // Registered ahead of the /api scope, which would otherwise claim the path
        let webhook_scope = web::scope("/api/payments/webhook")
            .wrap_fn(move |req, srv| {
                let peer_ip = get_remote_ip(req.request(), proxy.use_x_forwarded_for, proxy.use_forwarded);
                let whitelisted = match (peer_ip, &whitelist) {
                    (Some(ip), Some(whitelist)) => {
                        info!("💻️ Payment webhook from {ip}");
                        whitelist.contains(&ip)
                    },
                    (_, None) => true,
                    (None, Some(_)) => {
                        warn!("💻️ No IP address found in payment webhook request, denying access.");
                        false
                    },
                };
                if whitelisted {
                    srv.call(req)
                } else {
                    warn!("💻️ Payment webhook from {peer_ip:?} is not on the whitelist.");
                    ok(req.error_response(ServerError::ForbiddenPeer)).boxed_local()
                }
            })
            .service(PaymentWebhookRoute::<SqliteDatabase, IamportGateway>::new());
        // Literal paths before the ones with a placeholder in the same position
        let api_scope = web::scope("/api")
            .service(CheckoutRoute::<SqliteDatabase, IamportGateway>::new())
            .service(CancelledOrdersRoute::<SqliteDatabase, IamportGateway>::new())
            .service(MyOrdersRoute::<SqliteDatabase>::new())
            .service(OrderByIdRoute::<SqliteDatabase>::new())
            .service(CancelOrderRoute::<SqliteDatabase, IamportGateway>::new())
            .service(CancelRecordRoute::<SqliteDatabase, IamportGateway>::new())
            .service(CancelableRoute::<SqliteDatabase, IamportGateway>::new())
            .service(VerifyPaymentRoute::<SqliteDatabase, IamportGateway>::new())
            .service(PaymentByIdRoute::<SqliteDatabase, IamportGateway>::new())
            .service(UpdateOrderStatusRoute::<SqliteDatabase>::new())
            .service(MemberWithdrawalRoute::<SqliteDatabase, IamportGateway>::new())
            .service(OrderAuditRoute::<SqliteDatabase, IamportGateway>::new())
            .service(FailedRefundsRoute::<SqliteDatabase, IamportGateway>::new())
            .service(ReconcileRefundRoute::<SqliteDatabase, IamportGateway>::new());
        app.service(health).service(webhook_scope).service(api_scope)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((bind_addr.0.as_str(), bind_addr.1))?
    .run();
    Ok(srv)
}
