#![allow(dead_code)]

use axum::{Json, Router, extract::State, routing::post};
use sea_orm::{ActiveModelTrait, ActiveValue::Set, Database, DatabaseConnection, DbErr};
use sea_orm_migration::prelude::*;
use tablequery::{BaseQuery, DataTable, DataTableRequest, DataTableResponse};

pub mod post_entity;
pub mod user_entity;

/// Named users first, then bulk rows for paging.
pub const NAMED_USERS: [(&str, &str, Option<i32>, Option<&str>, i32); 6] = [
    ("Alice Johnson", "alice@example.com", Some(34), Some("Astronomer"), 3),
    ("Bob Smith", "bob@example.com", None, Some("Baker"), 1),
    ("John Doe", "john.doe@example.com", Some(28), Some("Archivist"), 5),
    ("Carol Johnson", "carol@sample.org", Some(45), None, 2),
    ("Dave Brown", "dave@sample.org", Some(19), Some("Drummer"), 4),
    ("Eve Adams", "eve@example.com", None, Some("Engineer"), 6),
];
pub const BULK_USERS: i32 = 14;
pub const TOTAL_USERS: u64 = 20;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_target(false)
        .compact()
        .try_init();
}

pub async fn setup_test_db() -> Result<DatabaseConnection, DbErr> {
    init_tracing();
    let db = Database::connect("sqlite::memory:").await?;

    // Run migrations
    Migrator::up(&db, None).await?;
    seed(&db).await?;

    Ok(db)
}

async fn seed(db: &DatabaseConnection) -> Result<(), DbErr> {
    for (index, (name, email, age, bio, rank)) in NAMED_USERS.iter().enumerate() {
        user_entity::ActiveModel {
            name: Set((*name).to_string()),
            email: Set((*email).to_string()),
            age: Set(*age),
            bio: Set(bio.map(str::to_string)),
            rank: Set(*rank),
            password: Set(format!("secret-{index}")),
            ..Default::default()
        }
        .insert(db)
        .await?;
    }

    for i in 1..=BULK_USERS {
        user_entity::ActiveModel {
            name: Set(format!("Bulk User {i:02}")),
            email: Set(format!("bulk{i:02}@bulk.test")),
            age: Set(Some(50 + i)),
            bio: Set(None),
            rank: Set(100 + i),
            password: Set(format!("secret-bulk-{i}")),
            ..Default::default()
        }
        .insert(db)
        .await?;
    }

    for (user_id, title) in [
        (1, "Stars at night"),
        (1, "Choosing a telescope"),
        (3, "Dusty archives"),
        (2, "Sourdough basics"),
    ] {
        post_entity::ActiveModel {
            user_id: Set(user_id),
            title: Set(title.to_string()),
            ..Default::default()
        }
        .insert(db)
        .await?;
    }

    Ok(())
}

async fn users_datatable(
    State(db): State<DatabaseConnection>,
    Json(request): Json<DataTableRequest>,
) -> DataTableResponse {
    use sea_orm::EntityTrait;

    DataTable::new(BaseQuery::from_select(user_entity::Entity::find()), request)
        .blacklist(["password"])
        .remove_column(&["password"])
        .set_row_id("id")
        .add_index_column()
        .make(&db)
        .await
}

pub fn setup_test_app(db: DatabaseConnection) -> Router {
    let api = Router::new()
        .route("/users/datatable", post(users_datatable))
        .with_state(db);

    Router::new().nest("/api/v1", api)
}

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![Box::new(CreateUserTable), Box::new(CreatePostTable)]
    }
}

pub struct CreateUserTable;

#[async_trait::async_trait]
impl MigrationName for CreateUserTable {
    fn name(&self) -> &'static str {
        "m20240101_000001_create_user_table"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for CreateUserTable {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let table = Table::create()
            .table(UserEntity)
            .if_not_exists()
            .col(
                ColumnDef::new(UserColumn::Id)
                    .integer()
                    .not_null()
                    .auto_increment()
                    .primary_key(),
            )
            .col(ColumnDef::new(UserColumn::Name).string().not_null())
            .col(ColumnDef::new(UserColumn::Email).string().not_null())
            .col(ColumnDef::new(UserColumn::Age).integer().null())
            .col(ColumnDef::new(UserColumn::Bio).text().null())
            .col(ColumnDef::new(UserColumn::Rank).integer().not_null())
            .col(ColumnDef::new(UserColumn::Password).string().not_null())
            .to_owned();

        manager.create_table(table).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(UserEntity).to_owned())
            .await?;
        Ok(())
    }
}

#[derive(Debug)]
pub enum UserColumn {
    Id,
    Name,
    Email,
    Age,
    Bio,
    Rank,
    Password,
}

impl Iden for UserColumn {
    fn unquoted(&self, s: &mut dyn std::fmt::Write) {
        write!(
            s,
            "{}",
            match self {
                Self::Id => "id",
                Self::Name => "name",
                Self::Email => "email",
                Self::Age => "age",
                Self::Bio => "bio",
                Self::Rank => "rank",
                Self::Password => "password",
            }
        )
        .unwrap();
    }
}

#[derive(Debug)]
pub struct UserEntity;

impl Iden for UserEntity {
    fn unquoted(&self, s: &mut dyn std::fmt::Write) {
        write!(s, "users").unwrap();
    }
}

pub struct CreatePostTable;

#[async_trait::async_trait]
impl MigrationName for CreatePostTable {
    fn name(&self) -> &'static str {
        "m20240101_000002_create_post_table"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for CreatePostTable {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let table = Table::create()
            .table(PostEntity)
            .if_not_exists()
            .col(
                ColumnDef::new(PostColumn::Id)
                    .integer()
                    .not_null()
                    .auto_increment()
                    .primary_key(),
            )
            .col(ColumnDef::new(PostColumn::UserId).integer().not_null())
            .col(ColumnDef::new(PostColumn::Title).string().not_null())
            .to_owned();

        manager.create_table(table).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PostEntity).to_owned())
            .await?;
        Ok(())
    }
}

#[derive(Debug)]
pub enum PostColumn {
    Id,
    UserId,
    Title,
}

impl Iden for PostColumn {
    fn unquoted(&self, s: &mut dyn std::fmt::Write) {
        write!(
            s,
            "{}",
            match self {
                Self::Id => "id",
                Self::UserId => "user_id",
                Self::Title => "title",
            }
        )
        .unwrap();
    }
}

#[derive(Debug)]
pub struct PostEntity;

impl Iden for PostEntity {
    fn unquoted(&self, s: &mut dyn std::fmt::Write) {
        write!(s, "posts").unwrap();
    }
}
