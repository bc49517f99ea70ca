//! Cart and wishlist, held in injected [`Store`]s instead of UI context.

use std::sync::Arc;

use domains::{AppError, CartItem, Domain, NewOrder, Order, OrderApi, Result};

use crate::store::Store;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CartState {
    pub items: Vec<CartItem>,
}

impl CartState {
    pub fn total(&self) -> f64 {
        self.items.iter().map(|i| i.price).sum()
    }

    pub fn contains(&self, domain_id: &str) -> bool {
        self.items.iter().any(|i| i.domain_id == domain_id)
    }
}

#[derive(Clone)]
pub struct Cart {
    store: Store<CartState>,
    orders: Arc<dyn OrderApi>,
}

impl Cart {
    pub fn new(orders: Arc<dyn OrderApi>) -> Self {
        Self {
            store: Store::new(CartState::default()),
            orders,
        }
    }

    pub fn store(&self) -> &Store<CartState> {
        &self.store
    }

    /// Adds a domain once. Sold or unavailable listings are refused.
    pub fn add(&self, domain: &Domain) -> Result<bool> {
        if domain.is_sold || !domain.is_available {
            return Err(AppError::Validation(format!("{} is no longer available", domain.name)));
        }
        let added = self.store.update_if(|cart| {
            if cart.contains(&domain.id) {
                return false;
            }
            cart.items.push(CartItem {
                domain_id: domain.id.clone(),
                name: domain.name.clone(),
                price: domain.price,
            });
            true
        });
        Ok(added)
    }

    pub fn remove(&self, domain_id: &str) -> bool {
        self.store.update_if(|cart| {
            let before = cart.items.len();
            cart.items.retain(|i| i.domain_id != domain_id);
            cart.items.len() != before
        })
    }

    pub fn clear(&self) {
        self.store.update(|cart| cart.items.clear());
    }

    /// Submits the cart as one order. The cart is emptied only on success.
    pub async fn checkout(&self, user_id: &str) -> Result<Order> {
        let snapshot = self.store.snapshot();
        if snapshot.items.is_empty() {
            return Err(AppError::Validation("cart is empty".into()));
        }
        let request = NewOrder {
            user_id: user_id.to_string(),
            total: snapshot.total(),
            items: snapshot.items,
        };
        match self.orders.create_order(request).await {
            Ok(order) => {
                tracing::info!(order_id = %order.id, total = order.total, "order placed");
                self.clear();
                Ok(order)
            }
            Err(err) => {
                tracing::error!(error = %err, "checkout failed");
                Err(err)
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WishlistState {
    pub domain_ids: Vec<String>,
}

#[derive(Clone)]
pub struct Wishlist {
    store: Store<WishlistState>,
}

impl Default for Wishlist {
    fn default() -> Self {
        Self::new()
    }
}

impl Wishlist {
    pub fn new() -> Self {
        Self {
            store: Store::new(WishlistState::default()),
        }
    }

    pub fn store(&self) -> &Store<WishlistState> {
        &self.store
    }

    /// Returns whether the domain is wishlisted after the toggle.
    pub fn toggle(&self, domain_id: &str) -> bool {
        self.store.update(|w| {
            if let Some(idx) = w.domain_ids.iter().position(|id| id == domain_id) {
                w.domain_ids.remove(idx);
                false
            } else {
                w.domain_ids.push(domain_id.to_string());
                true
            }
        })
    }

    pub fn contains(&self, domain_id: &str) -> bool {
        self.store.read(|w| w.domain_ids.iter().any(|id| id == domain_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domains::{DomainMetrics, MockOrderApi, OrderStatus};

    fn listing(id: &str, price: f64) -> Domain {
        Domain {
            id: id.into(),
            name: format!("{id}.com"),
            description: String::new(),
            registrar: None,
            tags: vec![],
            image: vec![],
            price,
            actual_price: None,
            is_available: true,
            is_sold: false,
            is_hot: false,
            featured: false,
            domain_type: None,
            metrics: DomainMetrics::default(),
            created_at: None,
        }
    }

    #[tokio::test]
    async fn checkout_clears_only_on_success() {
        let mut api = MockOrderApi::new();
        let mut seq = mockall::Sequence::new();
        api.expect_create_order()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Err(AppError::Api { status: 502, message: String::new() }));
        api.expect_create_order()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|req| {
                Ok(Order {
                    id: "o1".into(),
                    user_id: req.user_id,
                    total: req.total,
                    items: req.items,
                    status: OrderStatus::Pending,
                    created_at: None,
                })
            });

        let cart = Cart::new(Arc::new(api));
        assert!(cart.add(&listing("a", 100.0)).unwrap());
        assert!(!cart.add(&listing("a", 100.0)).unwrap());
        assert!(cart.add(&listing("b", 50.0)).unwrap());

        assert!(cart.checkout("u1").await.is_err());
        assert_eq!(cart.store().snapshot().items.len(), 2);

        let order = cart.checkout("u1").await.unwrap();
        assert_eq!(order.total, 150.0);
        assert!(cart.store().snapshot().items.is_empty());
    }

    #[test]
    fn sold_domains_cannot_be_added() {
        let cart = Cart::new(Arc::new(MockOrderApi::new()));
        let mut sold = listing("s", 10.0);
        sold.is_sold = true;
        assert!(cart.add(&sold).is_err());
        assert!(!cart.remove("s"));
    }

    #[test]
    fn wishlist_toggles() {
        let wishlist = Wishlist::new();
        assert!(wishlist.toggle("a"));
        assert!(wishlist.contains("a"));
        assert!(!wishlist.toggle("a"));
        assert!(!wishlist.contains("a"));
    }
}
