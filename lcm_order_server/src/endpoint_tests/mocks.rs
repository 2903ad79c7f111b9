use lcm_common::Won;
use lcm_order_engine::{
    db_types::{
        NewAuditEntry,
        NewOrder,
        NewOrderCancel,
        NewPayment,
        Order,
        OrderCancel,
        OrderId,
        OrderItem,
        OrderStatusType,
        OrderWithItems,
        Payment,
        PaymentAudit,
        PaymentStatus,
    },
    traits::{
        CancellationManagement,
        GatewayCancelReceipt,
        GatewayCancelRequest,
        GatewayError,
        GatewayTransaction,
        OrderManagement,
        OrderStoreError,
        PaymentGateway,
        PaymentStore,
    },
};
use mockall::mock;

mock! {
    pub OrderStore {}
    impl OrderManagement for OrderStore {
        async fn insert_order(&self, order: NewOrder) -> Result<OrderWithItems, OrderStoreError>;
        async fn fetch_order(&self, order_id: &OrderId) -> Result<Option<Order>, OrderStoreError>;
        async fn fetch_order_items(&self, order_id: &OrderId) -> Result<Vec<OrderItem>, OrderStoreError>;
        async fn fetch_orders_for_user(&self, user_id: &str) -> Result<Vec<Order>, OrderStoreError>;
        async fn transition_order_status(&self, order_id: &OrderId, allowed_from: &[OrderStatusType], status: OrderStatusType) -> Result<Option<Order>, OrderStoreError>;
        async fn update_order_status(&self, order_id: &OrderId, status: OrderStatusType) -> Result<Order, OrderStoreError>;
    }
    impl PaymentStore for OrderStore {
        async fn fetch_payment(&self, payment_id: &str) -> Result<Option<Payment>, OrderStoreError>;
        async fn fetch_payment_by_external_id(&self, external_id: &str) -> Result<Option<Payment>, OrderStoreError>;
        async fn fetch_completed_payment_for_order(&self, order_id: &OrderId) -> Result<Option<Payment>, OrderStoreError>;
        async fn insert_payment(&self, payment: NewPayment) -> Result<Payment, OrderStoreError>;
        async fn update_payment_status(&self, payment_id: &str, status: PaymentStatus) -> Result<Payment, OrderStoreError>;
        async fn record_audit(&self, entry: NewAuditEntry) -> Result<PaymentAudit, OrderStoreError>;
        async fn fetch_audit_for_order(&self, order_id: &OrderId) -> Result<Vec<PaymentAudit>, OrderStoreError>;
    }
    impl CancellationManagement for OrderStore {
        async fn fetch_cancel_for_order(&self, order_id: &OrderId) -> Result<Option<OrderCancel>, OrderStoreError>;
        async fn fetch_cancels_for_user(&self, user_id: &str) -> Result<Vec<OrderCancel>, OrderStoreError>;
        async fn commit_cancellation(&self, cancel: NewOrderCancel, terminal_status: OrderStatusType) -> Result<(OrderCancel, Order), OrderStoreError>;
        async fn fetch_failed_refunds(&self) -> Result<Vec<OrderCancel>, OrderStoreError>;
        async fn reconcile_refund(&self, order_id: &OrderId, external_cancel_id: Option<String>, note: &str) -> Result<OrderCancel, OrderStoreError>;
    }
}

mock! {
    pub Gateway {}
    impl PaymentGateway for Gateway {
        async fn prepare_transaction(&self, order_reference: &str, amount: Won) -> Result<(), GatewayError>;
        async fn query_transaction(&self, external_transaction_id: &str) -> Result<GatewayTransaction, GatewayError>;
        async fn cancel_transaction(&self, request: GatewayCancelRequest) -> Result<GatewayCancelReceipt, GatewayError>;
    }
}
