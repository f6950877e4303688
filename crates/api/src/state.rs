//! Shared application state.

use domain::{CustomerService, ProductService, ReportingService};
use store::RetailStore;
use workflow::{OrderWorkflow, PaymentProcessor};

/// Services reachable from the handlers. All of them share one store.
pub struct AppState<S: RetailStore + Clone> {
    pub products: ProductService<S>,
    pub customers: CustomerService<S>,
    pub reports: ReportingService<S>,
    pub orders: OrderWorkflow<S>,
    pub payments: PaymentProcessor<S>,
}

impl<S: RetailStore + Clone> AppState<S> {
    pub fn new(store: S) -> Self {
        Self {
            products: ProductService::new(store.clone()),
            customers: CustomerService::new(store.clone()),
            reports: ReportingService::new(store.clone()),
            orders: OrderWorkflow::new(store.clone()),
            payments: PaymentProcessor::new(store),
        }
    }
}
