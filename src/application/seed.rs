//! Demo catalog loader used by the `seed-catalog` command.

use std::sync::Arc;

use tracing::info;

use crate::application::repos::{
    CategoriesRepo, ContactParams, ContactsRepo, ProductParams, ProductsRepo, RepoError,
};

struct SeedProduct {
    name: &'static str,
    description: &'static str,
    /// Index into `CATEGORIES`.
    category: usize,
    /// Whole rubles.
    price: i64,
}

const CATEGORIES: &[(&str, &str)] = &[
    ("Электроника", "Гаджеты и техника"),
    ("Одежда", "Мужская и женская одежда"),
    ("Книги", "Печатные и электронные издания"),
    ("Бытовая техника", "Техника для дома"),
];

const PRODUCTS: &[SeedProduct] = &[
    SeedProduct {
        name: "Смартфон Samsung S24",
        description: "Флагман 2025 года, 256 ГБ",
        category: 0,
        price: 89_990,
    },
    SeedProduct {
        name: "Ноутбук Lenovo ThinkPad X1",
        description: "Core i7, 32 ГБ RAM, SSD 1 ТБ",
        category: 0,
        price: 189_990,
    },
    SeedProduct {
        name: "Футболка белая",
        description: "100% хлопок, размер M",
        category: 1,
        price: 1_490,
    },
    SeedProduct {
        name: "Книга «Django для начинающих»",
        description: "Пошаговое руководство по Django 5",
        category: 2,
        price: 990,
    },
    SeedProduct {
        name: "Пылесос Dyson V15",
        description: "Беспроводной пылесос премиум-класса",
        category: 3,
        price: 49_990,
    },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SeedReport {
    pub categories: usize,
    pub products: usize,
    pub contacts: usize,
}

pub struct CatalogSeeder {
    products: Arc<dyn ProductsRepo>,
    categories: Arc<dyn CategoriesRepo>,
    contacts: Arc<dyn ContactsRepo>,
}

impl CatalogSeeder {
    pub fn new(
        products: Arc<dyn ProductsRepo>,
        categories: Arc<dyn CategoriesRepo>,
        contacts: Arc<dyn ContactsRepo>,
    ) -> Self {
        Self {
            products,
            categories,
            contacts,
        }
    }

    /// Load the demo data into an empty catalog. A catalog that already has
    /// categories is left untouched.
    pub async fn run(&self) -> Result<SeedReport, RepoError> {
        let mut report = SeedReport::default();

        if !self.categories.list_categories().await?.is_empty() {
            info!(
                target = "skystore::seed",
                "catalog already has categories, skipping"
            );
            return Ok(report);
        }

        let mut category_ids = Vec::with_capacity(CATEGORIES.len());
        for (name, description) in CATEGORIES {
            let category = self.categories.create_category(name, description).await?;
            category_ids.push(category.id);
            report.categories += 1;
        }

        for product in PRODUCTS {
            let params = ProductParams {
                name: product.name.to_string(),
                description: product.description.to_string(),
                image: None,
                category_id: category_ids[product.category],
                price_minor: product.price * 100,
                is_published: true,
            };
            self.products.create_product(params, None).await?;
            report.products += 1;
        }

        if self.contacts.list_contacts().await?.is_empty() {
            self.contacts
                .create_contact(ContactParams {
                    name: "SkyStore".to_string(),
                    phone: "+7 (495) 000-00-00".to_string(),
                    email: "info@skystore.local".to_string(),
                    address: "Москва, ул. Примерная, 1".to_string(),
                    about: "Интернет-магазин электроники, одежды и книг.".to_string(),
                })
                .await?;
            report.contacts += 1;
        }

        info!(
            target = "skystore::seed",
            categories = report.categories,
            products = report.products,
            contacts = report.contacts,
            "demo catalog loaded"
        );
        Ok(report)
    }
}
