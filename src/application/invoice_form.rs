use bigdecimal::BigDecimal;

use crate::models::{CustomerId, InvoiceDraft, InvoiceItemDraft, Product, ProductId};

/// Outcome of looking a product's price up by name.
#[derive(Debug, Clone, PartialEq)]
pub enum PriceLookup {
    Found(BigDecimal),
    NoMatch,
}

/// `quantity * price * (100 - discount) / 100`
pub fn line_total(quantity: i32, price: &BigDecimal, discount: &BigDecimal) -> BigDecimal {
    let hundred = BigDecimal::from(100);
    BigDecimal::from(quantity) * price * (&hundred - discount) / hundred
}

/// Field state of the create/edit invoice form.
///
/// Changing quantity, price or discount recomputes the total once both a
/// quantity and a product are present. Writing the total itself never
/// triggers a recompute.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InvoiceForm {
    name: Option<String>,
    product: Option<String>,
    quantity: Option<i32>,
    price: Option<BigDecimal>,
    discount: Option<BigDecimal>,
    total: Option<BigDecimal>,
}

impl InvoiceForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_name(&mut self, name: Option<String>) {
        self.name = name;
    }

    pub fn set_quantity(&mut self, quantity: Option<i32>) {
        self.quantity = quantity;
        self.recompute_total();
    }

    pub fn set_discount(&mut self, discount: Option<BigDecimal>) {
        self.discount = discount;
        self.recompute_total();
    }

    pub fn set_price(&mut self, price: Option<BigDecimal>) {
        self.price = price;
        self.recompute_total();
    }

    pub fn set_total(&mut self, total: Option<BigDecimal>) {
        self.total = total;
    }

    /// Select a product by name and copy its price from `catalog`.
    ///
    /// An unknown name clears the price and reports `NoMatch`.
    pub fn select_product(&mut self, name: &str, catalog: &[Product]) -> PriceLookup {
        self.product = Some(name.to_string());
        let price = catalog
            .iter()
            .find(|product| product.name == name)
            .map(|product| product.price.clone());
        self.set_price(price.clone());

        match price {
            Some(price) => PriceLookup::Found(price),
            None => PriceLookup::NoMatch,
        }
    }

    pub fn clear_product(&mut self) {
        self.product = None;
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn product(&self) -> Option<&str> {
        self.product.as_deref()
    }

    pub fn quantity(&self) -> Option<i32> {
        self.quantity
    }

    pub fn price(&self) -> Option<&BigDecimal> {
        self.price.as_ref()
    }

    pub fn discount(&self) -> Option<&BigDecimal> {
        self.discount.as_ref()
    }

    pub fn total(&self) -> Option<&BigDecimal> {
        self.total.as_ref()
    }

    /// Build a create payload holding this form's single line.
    pub fn draft(&self, customer_id: Option<CustomerId>, product_id: ProductId) -> InvoiceDraft {
        InvoiceDraft {
            customer_id,
            discount: self.discount.clone(),
            total: self.total.clone(),
            items: self
                .quantity
                .map(|quantity| InvoiceItemDraft {
                    product_id,
                    quantity,
                })
                .into_iter()
                .collect(),
        }
    }

    fn recompute_total(&mut self) {
        let quantity = self.quantity.filter(|q| *q != 0);
        let has_product = self.product.as_deref().is_some_and(|p| !p.is_empty());
        let Some(quantity) = quantity.filter(|_| has_product) else {
            return;
        };

        let zero = BigDecimal::from(0);
        let price = self.price.as_ref().unwrap_or(&zero);
        let discount = self.discount.as_ref().unwrap_or(&zero);
        self.total = Some(line_total(quantity, price, discount));
    }
}
