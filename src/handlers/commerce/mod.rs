/// Commerce API handlers module
pub mod carts;
pub mod checkout;
pub mod products;
pub mod taxonomy;
