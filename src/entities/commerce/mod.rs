/// Commerce entities module
pub mod brand;
pub mod cart_item;
pub mod category;
pub mod color;
pub mod payment_method;
pub mod product;
pub mod product_image;
pub mod product_variant;
pub mod shipping_option;
pub mod size;

// Re-export entities
pub use brand::{Entity as Brand, Model as BrandModel};
pub use cart_item::{Entity as CartItem, Model as CartItemModel};
pub use category::{Entity as Category, Model as CategoryModel};
pub use color::{Entity as Color, Model as ColorModel};
pub use payment_method::{Entity as PaymentMethod, Model as PaymentMethodModel, PaymentMethodType};
pub use product::{Entity as Product, Model as ProductModel};
pub use product_image::{Entity as ProductImage, Model as ProductImageModel};
pub use product_variant::{Entity as ProductVariant, Model as ProductVariantModel};
pub use shipping_option::{Entity as ShippingOption, Model as ShippingOptionModel};
pub use size::{Entity as Size, Model as SizeModel};
