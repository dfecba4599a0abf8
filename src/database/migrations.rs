use tokio_postgres::Client;

/// Channel the insert trigger notifies on
pub const INSERT_CHANNEL: &str = "business_messages_insert";

// This function creates the chat tables and the insert notification trigger.
pub async fn apply_migrations(client: &Client) -> Result<(), String> {
    create_tables(client).await?;
    create_insert_trigger(client).await?;

    Ok(())
}

async fn create_tables(client: &Client) -> Result<(), String> {
    // Directory entries; only the columns the chat reads are required here
    let create_businesses_table_query = "
        CREATE TABLE IF NOT EXISTS businesses (
            id UUID PRIMARY KEY,
            name VARCHAR(255) NOT NULL,
            city VARCHAR(255),
            owner_id UUID
        )
    ";
    client
        .execute(create_businesses_table_query, &[])
        .await
        .map_err(|e| format!("Error creating businesses table: {}", e))?;

    let create_messages_table_query = "
        CREATE TABLE IF NOT EXISTS business_messages (
            id UUID PRIMARY KEY,
            business_id UUID NOT NULL REFERENCES businesses(id) ON DELETE CASCADE,
            sender_id UUID,
            sender_type TEXT NOT NULL CHECK (sender_type IN ('customer', 'business')),
            message TEXT NOT NULL,
            read BOOLEAN NOT NULL DEFAULT FALSE,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
    ";
    client
        .execute(create_messages_table_query, &[])
        .await
        .map_err(|e| format!("Error creating business_messages table: {}", e))?;

    let create_conversation_index_query = "
        CREATE INDEX IF NOT EXISTS business_messages_conversation_idx
        ON business_messages (business_id, created_at)
    ";
    client
        .execute(create_conversation_index_query, &[])
        .await
        .map_err(|e| format!("Error creating conversation index: {}", e))?;

    Ok(())
}

// Every insert notifies INSERT_CHANNEL with the new row id. The row itself
// would not fit: pg_notify payloads must stay under 8000 bytes.
fn notify_function() -> String {
    format!(
        "
        CREATE OR REPLACE FUNCTION notify_business_message_insert() RETURNS trigger AS $$
        BEGIN
            PERFORM pg_notify('{}', NEW.id::text);
            RETURN NEW;
        END;
        $$ LANGUAGE plpgsql
        ",
        INSERT_CHANNEL
    )
}

async fn create_insert_trigger(client: &Client) -> Result<(), String> {
    let notify_function = notify_function();
    client
        .batch_execute(&notify_function)
        .await
        .map_err(|e| format!("Error creating notify function: {}", e))?;

    let trigger = "
        DROP TRIGGER IF EXISTS business_messages_insert_notify ON business_messages;
        CREATE TRIGGER business_messages_insert_notify
            AFTER INSERT ON business_messages
            FOR EACH ROW EXECUTE FUNCTION notify_business_message_insert();
    ";
    client
        .batch_execute(trigger)
        .await
        .map_err(|e| format!("Error creating insert trigger: {}", e))?;

    Ok(())
}
