//! Integration tests for the query engine.

use criteria_core::catalog::{
    Catalog, EntityDef, FieldDef, FieldType, RelationDef, ScalarType, SchemaBundle,
};
use criteria_core::proto::{JoinKind, OrderDirection, Record, Value};
use criteria_core::query::get_field;
use criteria_core::{
    impl_from_row, Attr, EngineConfig, Entity, Error, MemoryProvider, PageSpec, QueryExecutor,
    Rel, Root,
};

#[derive(Debug, Clone, PartialEq)]
struct User {
    id: i64,
    name: String,
    email: Option<String>,
    age: i32,
}

impl User {
    const ID: Attr<User, i64> = Attr::new("id");
    const NAME: Attr<User, String> = Attr::new("name");
    const EMAIL: Attr<User, Option<String>> = Attr::new("email");
    const AGE: Attr<User, i32> = Attr::new("age");
    const POSTS: Rel<User, Vec<Post>> = Rel::new("posts");
}

impl Entity for User {
    const NAME: &'static str = "User";

    fn from_record(record: &Record) -> Result<Self, Error> {
        Ok(Self {
            id: get_field(record, "id")?,
            name: get_field(record, "name")?,
            email: get_field(record, "email")?,
            age: get_field(record, "age")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Post {
    id: i64,
    title: String,
    author_id: i64,
    views: i64,
}

impl Post {
    const AUTHOR_ID: Attr<Post, i64> = Attr::new("author_id");
    const TITLE: Attr<Post, String> = Attr::new("title");
    const VIEWS: Attr<Post, i64> = Attr::new("views");
    const AUTHOR: Rel<Post, User> = Rel::new("author");
    const COMMENTS: Rel<Post, Vec<Comment>> = Rel::new("comments");
}

impl Entity for Post {
    const NAME: &'static str = "Post";

    fn from_record(record: &Record) -> Result<Self, Error> {
        Ok(Self {
            id: get_field(record, "id")?,
            title: get_field(record, "title")?,
            author_id: get_field(record, "author_id")?,
            views: get_field(record, "views")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Comment {
    id: i64,
    text: String,
    post_id: i64,
}

impl Comment {
    const TEXT: Attr<Comment, String> = Attr::new("text");
}

impl Entity for Comment {
    const NAME: &'static str = "Comment";

    fn from_record(record: &Record) -> Result<Self, Error> {
        Ok(Self {
            id: get_field(record, "id")?,
            text: get_field(record, "text")?,
            post_id: get_field(record, "post_id")?,
        })
    }
}

#[derive(Debug, PartialEq)]
struct Headline {
    title: String,
    author: String,
}

impl_from_row!(Headline { title: String, author: String });

struct TestContext {
    provider: MemoryProvider,
    catalog: Catalog,
    config: EngineConfig,
}

impl TestContext {
    fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    fn with_config(config: EngineConfig) -> Self {
        let catalog = Catalog::new(blog_schema()).unwrap();
        Self {
            provider: MemoryProvider::for_catalog(&catalog),
            catalog,
            config,
        }
    }

    fn executor(&self) -> QueryExecutor<'_, MemoryProvider> {
        QueryExecutor::new(&self.provider, &self.catalog, &self.config)
    }

    fn insert_user(&self, id: i64, name: &str, email: Option<&str>, age: i32) {
        self.provider.insert(
            Record::new("User")
                .with_field("id", id)
                .with_field("name", name)
                .with_field("email", email.map_or(Value::Null, Value::from))
                .with_field("age", age),
        );
    }

    fn insert_post(&self, id: i64, title: &str, author_id: i64, views: i64) {
        self.provider.insert(
            Record::new("Post")
                .with_field("id", id)
                .with_field("title", title)
                .with_field("author_id", author_id)
                .with_field("views", views),
        );
    }

    fn insert_comment(&self, id: i64, text: &str, post_id: i64) {
        self.provider.insert(
            Record::new("Comment")
                .with_field("id", id)
                .with_field("text", text)
                .with_field("post_id", post_id),
        );
    }

    /// Alice (30) wrote two posts, Bob (25) one, Charlie (35) none.
    fn with_blog() -> Self {
        let ctx = Self::new();
        ctx.insert_user(1, "Alice", Some("alice@example.com"), 30);
        ctx.insert_user(2, "Bob", Some("bob@test.com"), 25);
        ctx.insert_user(3, "Charlie", None, 35);
        ctx.insert_post(10, "Hello", 1, 150);
        ctx.insert_post(11, "Rust", 1, 40);
        ctx.insert_post(12, "Databases", 2, 300);
        ctx.insert_comment(100, "Nice", 10);
        ctx.insert_comment(101, "Thanks", 10);
        ctx.insert_comment(102, "Great", 12);
        ctx
    }
}

fn blog_schema() -> SchemaBundle {
    let int64 = || FieldType::Scalar(ScalarType::Int64);
    let string = || FieldType::Scalar(ScalarType::String);

    let user = EntityDef::new("User", "id")
        .with_field(FieldDef::new("id", int64()))
        .with_field(FieldDef::new("name", string()))
        .with_field(FieldDef::optional("email", string()))
        .with_field(FieldDef::new("age", FieldType::Scalar(ScalarType::Int32)));

    let post = EntityDef::new("Post", "id")
        .with_field(FieldDef::new("id", int64()))
        .with_field(FieldDef::new("title", string()))
        .with_field(FieldDef::new("author_id", int64()))
        .with_field(FieldDef::new("views", int64()));

    let comment = EntityDef::new("Comment", "id")
        .with_field(FieldDef::new("id", int64()))
        .with_field(FieldDef::new("text", string()))
        .with_field(FieldDef::new("post_id", int64()));

    SchemaBundle::new(1)
        .with_entity(user)
        .with_entity(post)
        .with_entity(comment)
        .with_relation(RelationDef::one_to_many(
            "posts", "User", "id", "Post", "author_id",
        ))
        .with_relation(RelationDef::many_to_one(
            "author", "Post", "author_id", "User", "id",
        ))
        .with_relation(RelationDef::one_to_many(
            "comments", "Post", "id", "Comment", "post_id",
        ))
}

// ============== Tests ==============

#[test]
fn test_simple_entity_query() {
    let ctx = TestContext::with_blog();

    let users: Vec<User> = ctx.executor().all(|_: &Root<'_, User>| {}).unwrap();

    assert_eq!(users.len(), 3);
    assert!(users.iter().any(|u| u.id == 1 && u.name == "Alice" && u.age == 30));
}

#[test]
fn test_filter_equality() {
    let ctx = TestContext::with_blog();

    let users: Vec<User> = ctx
        .executor()
        .all(|q: &Root<'_, User>| q.get(User::NAME).eq("Alice"))
        .unwrap();

    assert_eq!(users.len(), 1);
    assert_eq!(users[0].email.as_deref(), Some("alice@example.com"));
}

#[test]
fn test_filter_comparison() {
    let ctx = TestContext::new();
    for i in 0..10 {
        ctx.insert_user(i, &format!("User{}", i), None, 20 + i as i32);
    }
    let executor = ctx.executor();

    // ages 26, 27, 28, 29
    let older = executor
        .count(|q: &Root<'_, User>| q.get(User::AGE).gt(25))
        .unwrap();
    assert_eq!(older, 4);

    // ages 20, 21, 22
    let younger = executor
        .count(|q: &Root<'_, User>| q.get(User::AGE).le(22))
        .unwrap();
    assert_eq!(younger, 3);
}

#[test]
fn test_filter_compound() {
    let ctx = TestContext::with_blog();

    let names: Vec<String> = ctx
        .executor()
        .all(|q: &Root<'_, User>| {
            q.get(User::AGE).gt(25);
            q.get(User::EMAIL).like("%example.com");
            q.select(q.get(User::NAME));
        })
        .unwrap();

    assert_eq!(names, vec!["Alice"]);
}

#[test]
fn test_or_binds_to_everything_before() {
    let ctx = TestContext::with_blog();

    // (age > 26 AND email IS NULL) OR name = 'Bob'
    let mut names: Vec<String> = ctx
        .executor()
        .all(|q: &Root<'_, User>| {
            q.get(User::AGE).gt(26);
            q.get(User::EMAIL).is_null();
            q.or();
            q.get(User::NAME).eq("Bob");
            q.select(q.get(User::NAME));
        })
        .unwrap();
    names.sort();

    assert_eq!(names, vec!["Bob", "Charlie"]);
}

#[test]
fn test_sorting_ascending() {
    let ctx = TestContext::with_blog();

    let names: Vec<String> = ctx
        .executor()
        .all(|q: &Root<'_, User>| {
            q.order_by(q.get(User::NAME), OrderDirection::Asc);
            q.select(q.get(User::NAME));
        })
        .unwrap();

    assert_eq!(names, vec!["Alice", "Bob", "Charlie"]);
}

#[test]
fn test_sorting_descending() {
    let ctx = TestContext::new();
    for i in 0..5 {
        ctx.insert_user(i, &format!("User{}", i), None, 20 + i as i32);
    }

    let ages: Vec<i32> = ctx
        .executor()
        .all_sorted(&[User::AGE.desc()], |q: &Root<'_, User>| {
            q.select(q.get(User::AGE))
        })
        .unwrap();

    assert_eq!(ages, vec![24, 23, 22, 21, 20]);
}

#[test]
fn test_pagination() {
    let ctx = TestContext::new();
    for i in 0..10 {
        ctx.insert_user(i, &format!("User{}", i), None, 20 + i as i32);
    }
    let executor = ctx.executor();

    let page = executor
        .pages_sorted::<User, i64, _>(User::ID, PageSpec::new(1, 3), |q| {
            q.select(q.get(User::ID))
        })
        .unwrap();

    assert_eq!(page.rows, vec![3, 4, 5]);
    assert_eq!(page.total_elements, 10);
    assert_eq!(page.total_pages, 4);
    assert!(page.has_next());

    let last = executor
        .pages_sorted::<User, i64, _>(User::ID, PageSpec::new(3, 3), |q| {
            q.select(q.get(User::ID))
        })
        .unwrap();
    assert_eq!(last.rows, vec![9]);
    assert!(!last.has_next());
}

#[test]
fn test_field_projection() {
    let ctx = TestContext::with_blog();

    let pairs: Vec<(String, i32)> = ctx
        .executor()
        .all(|q: &Root<'_, User>| {
            q.get(User::AGE).lt(35);
            q.order_by(q.get(User::AGE), OrderDirection::Asc);
            q.select_tuple((q.get(User::NAME), q.get(User::AGE)));
        })
        .unwrap();

    assert_eq!(pairs, vec![("Bob".to_string(), 25), ("Alice".to_string(), 30)]);
}

#[test]
fn test_navigation_creates_inner_join() {
    let ctx = TestContext::with_blog();

    let headlines: Vec<Headline> = ctx
        .executor()
        .all(|p: &Root<'_, Post>| {
            p.rel(Post::AUTHOR).get(User::AGE).ge(30);
            p.order_by(p.get(Post::TITLE), OrderDirection::Asc);
            p.select_tuple((p.get(Post::TITLE), p.rel(Post::AUTHOR).get(User::NAME)));
        })
        .unwrap();

    assert_eq!(
        headlines,
        vec![
            Headline {
                title: "Hello".into(),
                author: "Alice".into()
            },
            Headline {
                title: "Rust".into(),
                author: "Alice".into()
            },
        ]
    );
}

#[test]
fn test_join_many_with_distinct() {
    let ctx = TestContext::with_blog();
    let executor = ctx.executor();

    // Alice has two posts, each join row repeats her.
    let repeated: Vec<String> = executor
        .all(|q: &Root<'_, User>| {
            let posts = q.join_many(User::POSTS, JoinKind::Inner);
            posts.get(Post::VIEWS).gt(10);
            q.select(q.get(User::NAME));
        })
        .unwrap();
    assert_eq!(repeated.len(), 3);

    let mut distinct: Vec<String> = executor
        .all(|q: &Root<'_, User>| {
            let posts = q.join_many(User::POSTS, JoinKind::Inner);
            posts.get(Post::VIEWS).gt(10);
            q.select(q.get(User::NAME));
            q.distinct();
        })
        .unwrap();
    distinct.sort();
    assert_eq!(distinct, vec!["Alice", "Bob"]);
}

#[test]
fn test_nested_join() {
    let ctx = TestContext::with_blog();

    let texts: Vec<(String, String)> = ctx
        .executor()
        .all(|q: &Root<'_, User>| {
            let posts = q.join_many(User::POSTS, JoinKind::Inner);
            let comments = posts.join_many(Post::COMMENTS, JoinKind::Inner);
            q.get(User::NAME).eq("Alice");
            q.order_by(comments.get(Comment::TEXT), OrderDirection::Asc);
            q.select_tuple((posts.get(Post::TITLE), comments.get(Comment::TEXT)));
        })
        .unwrap();

    assert_eq!(
        texts,
        vec![
            ("Hello".to_string(), "Nice".to_string()),
            ("Hello".to_string(), "Thanks".to_string()),
        ]
    );
}

#[test]
fn test_relation_emptiness() {
    let ctx = TestContext::with_blog();
    let executor = ctx.executor();

    let idle: Vec<String> = executor
        .all(|q: &Root<'_, User>| {
            q.rel(User::POSTS).is_empty();
            q.select(q.get(User::NAME));
        })
        .unwrap();
    assert_eq!(idle, vec!["Charlie"]);

    let commented = executor
        .count(|p: &Root<'_, Post>| p.rel(Post::COMMENTS).is_not_empty())
        .unwrap();
    assert_eq!(commented, 2);
}

#[test]
fn test_aggregates() {
    let ctx = TestContext::with_blog();
    let executor = ctx.executor();

    let total: Option<i64> = executor
        .one(|p: &Root<'_, Post>| p.select(p.get(Post::VIEWS).sum()))
        .unwrap();
    assert_eq!(total, Some(490));

    let busiest: Option<i64> = executor
        .one(|p: &Root<'_, Post>| {
            p.rel(Post::AUTHOR).get(User::NAME).eq("Alice");
            p.select(p.get(Post::VIEWS).max());
        })
        .unwrap();
    assert_eq!(busiest, Some(150));

    let none: Option<i64> = executor
        .one(|p: &Root<'_, Post>| {
            p.get(Post::VIEWS).gt(1000);
            p.select(p.get(Post::VIEWS).sum());
        })
        .unwrap();
    assert_eq!(none, None);
}

#[test]
fn test_correlated_subquery() {
    let ctx = TestContext::with_blog();

    // The most viewed post of each author.
    let titles: Vec<String> = ctx
        .executor()
        .all(|p: &Root<'_, Post>| {
            let author = p.get(Post::AUTHOR_ID);
            let top = p.subquery(|other: &Root<'_, Post>| {
                other.get(Post::AUTHOR_ID).eq_expr(&author);
                other.get(Post::VIEWS).max()
            });
            p.get(Post::VIEWS).eq_expr(top);
            p.order_by(p.get(Post::TITLE), OrderDirection::Asc);
            p.select(p.get(Post::TITLE));
        })
        .unwrap();
    assert_eq!(titles, vec!["Databases", "Hello"]);
}

#[test]
fn test_join_selects_entities() {
    let ctx = TestContext::with_blog();

    let pairs: Vec<(Post, Comment)> = ctx
        .executor()
        .all(|p: &Root<'_, Post>| {
            let comments = p.join_many(Post::COMMENTS, JoinKind::Inner);
            p.select_tuple((p, &comments));
        })
        .unwrap();

    assert_eq!(pairs.len(), 3);
    for (post, comment) in &pairs {
        assert_eq!(post.id, comment.post_id);
        assert!(comment.id >= 100);
    }
    assert!(pairs.iter().all(|(post, _)| post.author_id != 3));
}

#[test]
fn test_budget_result_limit() {
    let ctx = TestContext::with_config(EngineConfig::new().with_max_results(2));
    ctx.insert_user(1, "Alice", None, 30);
    ctx.insert_user(2, "Bob", None, 25);
    let executor = ctx.executor();

    let users: Vec<User> = executor.all(|_: &Root<'_, User>| {}).unwrap();
    assert_eq!(users.len(), 2);

    ctx.insert_user(3, "Charlie", None, 35);
    let err = executor
        .all::<User, User>(|_| {})
        .unwrap_err();
    assert!(matches!(err, Error::ResultLimitExceeded { limit: 2 }));
}

#[test]
fn test_empty_result() {
    let ctx = TestContext::new();

    let users: Vec<User> = ctx.executor().all(|_: &Root<'_, User>| {}).unwrap();
    assert!(users.is_empty());
    assert!(!ctx.executor().exists(|_: &Root<'_, User>| {}).unwrap());
}

#[test]
fn test_filter_in_values() {
    let ctx = TestContext::with_blog();

    let mut names: Vec<String> = ctx
        .executor()
        .all(|q: &Root<'_, User>| {
            q.get(User::ID).is_in([1, 3]);
            q.select(q.get(User::NAME));
        })
        .unwrap();
    names.sort();
    assert_eq!(names, vec!["Alice", "Charlie"]);

    let rest: Vec<String> = ctx
        .executor()
        .all(|q: &Root<'_, User>| {
            q.get(User::ID).not_in([1, 3]);
            q.select(q.get(User::NAME));
        })
        .unwrap();
    assert_eq!(rest, vec!["Bob"]);
}

#[test]
fn test_filter_like_pattern() {
    let ctx = TestContext::with_blog();
    let executor = ctx.executor();

    let starts: Vec<String> = executor
        .all(|q: &Root<'_, User>| {
            q.get(User::NAME).like("A%");
            q.select(q.get(User::NAME));
        })
        .unwrap();
    assert_eq!(starts, vec!["Alice"]);

    let single: Vec<String> = executor
        .all(|q: &Root<'_, User>| {
            q.get(User::NAME).like("B_b");
            q.select(q.get(User::NAME));
        })
        .unwrap();
    assert_eq!(single, vec!["Bob"]);

    // NULL email is neither like nor not like the pattern.
    let others = executor
        .count(|q: &Root<'_, User>| q.get(User::EMAIL).not_like("%example.com"))
        .unwrap();
    assert_eq!(others, 1);
}

#[test]
fn test_translation_errors() {
    let ctx = TestContext::with_blog();
    let executor = ctx.executor();

    let err = executor
        .all::<User, String>(|q| q.field("posts").field("title").eq("Hello"))
        .unwrap_err();
    assert!(matches!(err, Error::PathResolution { .. }));
    assert!(err.is_translation());

    let err = executor
        .all::<User, String>(|q| q.field("age").like("3%"))
        .unwrap_err();
    assert!(matches!(err, Error::TypeMismatch { .. }));

    let err = executor
        .all::<User, i64>(|q| q.select(q.get(User::NAME)))
        .unwrap_err();
    assert!(matches!(err, Error::ProjectionType { .. }));

    let err = executor
        .all::<User, (String, i32, i64)>(|q| {
            q.select_tuple((q.get(User::NAME), q.get(User::AGE)))
        })
        .unwrap_err();
    assert!(matches!(
        err,
        Error::ProjectionArity {
            expected: 3,
            found: 2
        }
    ));
}

#[test]
fn test_prepared_query_reruns() {
    let ctx = TestContext::with_blog();
    let executor = ctx.executor();

    let prepared = executor
        .prepare::<Post, String>(|p| {
            p.get(Post::VIEWS).ge_expr(p.param("min_views", 100i64));
            p.select(p.get(Post::TITLE));
        })
        .unwrap();
    assert_eq!(prepared.query().root_entity, "Post");

    let mut titles = executor.run(&prepared).unwrap();
    titles.sort();
    assert_eq!(titles, vec!["Databases", "Hello"]);

    ctx.insert_post(13, "Graphs", 3, 120);
    assert_eq!(executor.run(&prepared).unwrap().len(), 3);
}
