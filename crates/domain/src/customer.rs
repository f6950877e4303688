//! Customer administration.

use common::CustomerId;
use store::{Customer, CustomerGateway, CustomerUpdate, NewCustomer, OrderGateway};

use crate::error::{DomainError, Result};

const LIST_LIMIT: usize = 100;

/// Service for managing customers.
///
/// Needs order access to refuse deleting customers that still have orders.
pub struct CustomerService<S: CustomerGateway + OrderGateway> {
    store: S,
}

impl<S: CustomerGateway + OrderGateway> CustomerService<S> {
    /// Creates a new customer service over the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Adds a customer with a unique email.
    #[tracing::instrument(skip(self, customer), fields(email = %customer.email))]
    pub async fn add_customer(&self, customer: NewCustomer) -> Result<Customer> {
        if customer.name.trim().is_empty() || customer.email.trim().is_empty() {
            return Err(DomainError::InvalidInput(
                "Customer name and email are required".to_string(),
            ));
        }
        if self
            .store
            .get_customer_by_email(&customer.email)
            .await?
            .is_some()
        {
            return Err(DomainError::Conflict(format!(
                "A customer with email '{}' already exists",
                customer.email
            )));
        }

        let created = self.store.create_customer(customer).await?;
        tracing::info!(customer_id = %created.id, "customer added");
        Ok(created)
    }

    /// Updates a customer's phone and/or city.
    #[tracing::instrument(skip(self))]
    pub async fn update_customer_details(
        &self,
        id: CustomerId,
        phone: Option<String>,
        city: Option<String>,
    ) -> Result<Customer> {
        let phone = phone.filter(|p| !p.is_empty());
        let city = city.filter(|c| !c.is_empty());
        if phone.is_none() && city.is_none() {
            return Err(DomainError::InvalidInput(
                "No update information provided. Please supply a phone or city".to_string(),
            ));
        }

        self.get_customer(id).await?;
        self.store
            .update_customer(id, CustomerUpdate { phone, city })
            .await?
            .ok_or_else(|| DomainError::not_found("Customer", id))
    }

    /// Deletes a customer that has no orders.
    #[tracing::instrument(skip(self))]
    pub async fn delete_customer(&self, id: CustomerId) -> Result<Customer> {
        self.get_customer(id).await?;

        let orders = self.store.list_orders_by_customer(id).await?;
        if !orders.is_empty() {
            return Err(DomainError::Conflict(format!(
                "Cannot delete customer {id}. They have {} existing order(s)",
                orders.len()
            )));
        }

        let deleted = self
            .store
            .delete_customer(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Customer", id))?;
        tracing::info!(customer_id = %id, "customer deleted");
        Ok(deleted)
    }

    /// Loads a customer by id.
    pub async fn get_customer(&self, id: CustomerId) -> Result<Customer> {
        self.store
            .get_customer(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Customer", id))
    }

    pub async fn list_customers(&self) -> Result<Vec<Customer>> {
        Ok(self.store.list_customers(LIST_LIMIT).await?)
    }

    /// Finds customers by email (exact, takes precedence) or by city.
    pub async fn find_customers(
        &self,
        email: Option<&str>,
        city: Option<&str>,
    ) -> Result<Vec<Customer>> {
        let email = email.filter(|e| !e.is_empty());
        let city = city.filter(|c| !c.is_empty());

        match (email, city) {
            (Some(email), _) => Ok(self
                .store
                .get_customer_by_email(email)
                .await?
                .into_iter()
                .collect()),
            (None, Some(city)) => Ok(self
                .store
                .search_customers_by_city(city, LIST_LIMIT)
                .await?),
            (None, None) => Err(DomainError::InvalidInput(
                "Please provide an email or a city to search by".to_string(),
            )),
        }
    }
}
