//! Shared fixture: users with todos and addresses.

#![allow(dead_code)]

use criteria::catalog::{EntityDef, FieldDef, FieldType, RelationDef, ScalarType, SchemaBundle};
use criteria::prelude::*;
use criteria::proto::{Record, Value};
use criteria::query::get_field;

#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub login: Option<String>,
    pub roles: Vec<String>,
    pub address_id: Option<i64>,
    pub current_todo_id: Option<i64>,
}

impl User {
    pub const ID: Attr<User, i64> = Attr::new("id");
    pub const EMAIL: Attr<User, String> = Attr::new("email");
    pub const LOGIN: Attr<User, Option<String>> = Attr::new("login");
    pub const ROLES: Attr<User, Vec<String>> = Attr::new("roles");
    pub const ADDRESS: Rel<User, Address> = Rel::new("address");
    pub const CURRENT_TODO: Rel<User, Todo> = Rel::new("current_todo");
    pub const TODOS: Rel<User, Vec<Todo>> = Rel::new("todos");
}

impl Entity for User {
    const NAME: &'static str = "User";

    fn from_record(record: &Record) -> Result<Self, Error> {
        Ok(Self {
            id: get_field(record, "id")?,
            email: get_field(record, "email")?,
            login: get_field(record, "login")?,
            roles: get_field::<Option<Vec<String>>>(record, "roles")?.unwrap_or_default(),
            address_id: get_field(record, "address_id")?,
            current_todo_id: get_field(record, "current_todo_id")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Todo {
    pub id: i64,
    pub name: String,
    pub importance: i32,
    pub user_id: Option<i64>,
}

impl Todo {
    pub const ID: Attr<Todo, i64> = Attr::new("id");
    pub const NAME: Attr<Todo, String> = Attr::new("name");
    pub const IMPORTANCE: Attr<Todo, i32> = Attr::new("importance");
    pub const USER_ID: Attr<Todo, Option<i64>> = Attr::new("user_id");
}

impl Entity for Todo {
    const NAME: &'static str = "Todo";

    fn from_record(record: &Record) -> Result<Self, Error> {
        Ok(Self {
            id: get_field(record, "id")?,
            name: get_field(record, "name")?,
            importance: get_field(record, "importance")?,
            user_id: get_field(record, "user_id")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Address {
    pub id: i64,
    pub city: String,
}

impl Address {
    pub const CITY: Attr<Address, String> = Attr::new("city");
}

impl Entity for Address {
    const NAME: &'static str = "Address";

    fn from_record(record: &Record) -> Result<Self, Error> {
        Ok(Self {
            id: get_field(record, "id")?,
            city: get_field(record, "city")?,
        })
    }
}

pub fn schema() -> SchemaBundle {
    let int64 = || FieldType::Scalar(ScalarType::Int64);
    let string = || FieldType::Scalar(ScalarType::String);

    SchemaBundle::new(1)
        .with_entity(
            EntityDef::new("User", "id")
                .with_field(FieldDef::new("id", int64()))
                .with_field(FieldDef::new("email", string()))
                .with_field(FieldDef::optional("login", string()))
                .with_field(FieldDef::new(
                    "roles",
                    FieldType::ArrayScalar(ScalarType::String),
                ))
                .with_field(FieldDef::optional("address_id", int64()))
                .with_field(FieldDef::optional("current_todo_id", int64())),
        )
        .with_entity(
            EntityDef::new("Todo", "id")
                .with_field(FieldDef::new("id", int64()))
                .with_field(FieldDef::new("name", string()))
                .with_field(FieldDef::new(
                    "importance",
                    FieldType::Scalar(ScalarType::Int32),
                ))
                .with_field(FieldDef::optional("user_id", int64())),
        )
        .with_entity(
            EntityDef::new("Address", "id")
                .with_field(FieldDef::new("id", int64()))
                .with_field(FieldDef::new("city", string())),
        )
        .with_relation(RelationDef::many_to_one(
            "address",
            "User",
            "address_id",
            "Address",
            "id",
        ))
        .with_relation(RelationDef::many_to_one(
            "current_todo",
            "User",
            "current_todo_id",
            "Todo",
            "id",
        ))
        .with_relation(RelationDef::one_to_many(
            "todos", "User", "id", "Todo", "user_id",
        ))
}

pub fn engine() -> Engine {
    Engine::new(schema()).unwrap()
}

pub fn user(id: i64, email: &str, login: Option<&str>, roles: &[&str]) -> Record {
    Record::new("User")
        .with_field("id", id)
        .with_field("email", email)
        .with_field("login", login.map_or(Value::Null, Value::from))
        .with_field(
            "roles",
            roles.iter().map(|r| r.to_string()).collect::<Vec<_>>(),
        )
        .with_field("address_id", Value::Null)
        .with_field("current_todo_id", Value::Null)
}

pub fn todo(id: i64, name: &str, importance: i32, user_id: i64) -> Record {
    Record::new("Todo")
        .with_field("id", id)
        .with_field("name", name)
        .with_field("importance", importance)
        .with_field("user_id", user_id)
}

/// Users email1 (login ccc, ADMIN, Berlin, current todo 1), email2
/// (login aaa, USER, Paris) and email3 (no login, current todo 4).
///
/// Todos task1 (5) and task2 (15) belong to user 1, task3 (20) to user 2
/// and task4 (1) to user 3.
pub fn seeded(engine: &Engine) -> MemoryProvider {
    let provider = MemoryProvider::for_catalog(engine.catalog());
    provider.insert_all([
        user(1, "email1", Some("ccc"), &["ADMIN"])
            .with_field("address_id", 1i64)
            .with_field("current_todo_id", 1i64),
        user(2, "email2", Some("aaa"), &["USER"]).with_field("address_id", 2i64),
        user(3, "email3", None, &[]).with_field("current_todo_id", 4i64),
        todo(1, "task1", 5, 1),
        todo(2, "task2", 15, 1),
        todo(3, "task3", 20, 2),
        todo(4, "task4", 1, 3),
        Record::new("Address")
            .with_field("id", 1i64)
            .with_field("city", "Berlin"),
        Record::new("Address")
            .with_field("id", 2i64)
            .with_field("city", "Paris"),
    ]);
    provider
}

/// `count` users named user0.. with logins login0.. and no relations.
pub fn numbered(engine: &Engine, count: i64) -> MemoryProvider {
    let provider = MemoryProvider::for_catalog(engine.catalog());
    provider.insert_all((0..count).map(|i| {
        user(
            i,
            &format!("user{}", i),
            Some(&format!("login{}", i)),
            &[],
        )
    }));
    provider
}
