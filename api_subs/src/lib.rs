use actix_web::web::{self};

pub mod routes {
    pub mod pay;
    pub mod sub;
}

mod services {
    pub(crate) mod pay;
    pub(crate) mod provider;
    pub(crate) mod queue;
    pub(crate) mod reconcile;
    pub(crate) mod store;
    pub(crate) mod sub;
}

mod dtos {
    pub(crate) mod pay;
    pub(crate) mod sub;
}

pub mod models {
    pub mod sub;
}

#[cfg(test)]
mod testing;

pub use services::{
    provider::{BillingProvider, StripeProvider},
    queue::{ReconcileJob, WebhookQueue},
    reconcile::{Reconciled, Reconciler},
    store::{PgSubscriptionStore, SubscriptionStore},
};

pub fn mount_subs() -> actix_web::Scope {
    web::scope("/sub")
        .service(routes::sub::post_sync)
        .service(routes::sub::get_current)
}
pub fn mount_plans() -> actix_web::Scope {
    web::scope("/sub").service(routes::sub::get_plans)
}
pub fn mount_webhook() -> actix_web::Scope {
    web::scope("/pay").service(routes::pay::post_webhook)
}
