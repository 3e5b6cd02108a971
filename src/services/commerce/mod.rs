/// Commerce services module - Cart, catalog, taxonomy and pricing
pub mod cart_service;
pub mod pricing_service;
pub mod product_catalog_service;
pub mod taxonomy_service;

// Re-export services for convenience
pub use cart_service::{AddToCartInput, CartLineView, CartService, CartView};
pub use pricing_service::PricedLine;
pub use product_catalog_service::{
    CreateImageInput, CreateProductInput, CreateVariantInput, ProductCatalogService,
    ProductDetail, ProductFilter, ProductPage, UpdateProductInput,
};
pub use taxonomy_service::{
    CreateBrandInput, CreateCategoryInput, CreateColorInput, CreateSizeInput, TaxonomyService,
    UpdateBrandInput, UpdateCategoryInput,
};
