mod checkout;
mod order;
mod payment;
mod pending;
mod presenter;
mod repository;
mod status;
mod verification;

pub use checkout::{
    CheckoutError, CheckoutOrchestrator, CheckoutPayload, MAX_DELIVERY_FEE, checkout_endpoint,
    checkout_form_endpoint, generate_order_number,
};
pub use order::{
    BadgeColor, Customer, NewOrder, NewOrderLine, Order, OrderLine, OrderStatus, OrderView,
    StatusBadge,
};
pub use payment::{FormField, PaymentRedirect, PaymentSettings, format_amount};
pub use pending::{
    DEFAULT_PENDING_TIMEOUT, PAYMENT_BACKUP_KEY_PREFIX, PENDING_ORDERS_KEY, PENDING_VERIFICATION,
    PaymentBackup, PendingOrderEntry, PendingOrders, SweepReport, payment_backup_key,
};
pub use presenter::{OrderFeed, OrderStatusPresenter, OrderSubscription, live_order_endpoint};
pub use repository::{MemoryOrderRepository, OrderRepository, PgOrderRepository, delete_order};
pub use status::{UpdateStatusPayload, get_order_endpoint, update_status_endpoint};
pub use verification::{
    PaymentVerifier, VerificationError, VerificationSettings, payment_return_endpoint,
};
