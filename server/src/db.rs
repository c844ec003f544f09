use anyhow::Result;
use bb8_postgres::PostgresConnectionManager;
use tokio_postgres::NoTls;

pub type Pool = bb8::Pool<PostgresConnectionManager<NoTls>>;
pub type Client<'a> = bb8::PooledConnection<'a, PostgresConnectionManager<NoTls>>;

mod embedded {
    use refinery::embed_migrations;
    embed_migrations!("migrations");
}

pub async fn pool(database_url: &str) -> Result<Pool> {
    let mgr = PostgresConnectionManager::new(database_url.parse()?, NoTls);
    let pool = bb8::Pool::builder().build(mgr).await?;
    Ok(pool)
}

pub async fn health(pool: &Pool) -> Result<()> {
    let client = pool.get().await?;
    client.query_one("SELECT 1", &[]).await?;
    Ok(())
}

async fn connect(database_url: &str) -> Result<tokio_postgres::Client> {
    let (client, connection) = tokio_postgres::connect(database_url, NoTls).await?;
    tokio::spawn(async move {
        if let Err(e) = connection.await {
            log::error!("DB connection error: {}", e);
        }
    });
    Ok(client)
}

pub async fn migrate(database_url: &str) -> Result<()> {
    let mut client = connect(database_url).await?;
    embedded::migrations::runner().run_async(&mut client).await?;
    Ok(())
}

pub async fn reset(database_url: &str) -> Result<()> {
    let client = connect(database_url).await?;
    client
        .batch_execute("DROP SCHEMA public CASCADE; CREATE SCHEMA public;")
        .await?;
    drop(client);
    migrate(database_url).await
}
