
/// Integration tests combining multiple components
pub mod integration_tests {
    use crate::db::connect;
    use crate::{api_key, model_config, task, user};
    use anyhow::Result;
    use migration::MigratorTrait;
    use sea_orm::EntityTrait;
    use uuid::Uuid;

    /// Test complete workflow: user -> api_key -> model_config -> task
    #[tokio::test]
    async fn test_complete_workflow() -> Result<()> {
        if std::env::var("SKIP_DB_TESTS").is_ok() {
            return Ok(());
        }
        let db = match connect().await {
            Ok(db) => db,
            Err(e) => {
                eprintln!("skip: cannot connect to db: {}", e);
                return Ok(());
            }
        };
        migration::Migrator::up(&db, None).await?;

        let email = format!("workflow_{}@example.com", Uuid::new_v4());
        let test_user = user::create(&db, &email, "Workflow User").await?;

        let digest = format!("{:0>64}", Uuid::new_v4().simple());
        let test_key = api_key::create(&db, test_user.id, &digest, "workflow").await?;

        let mc = model_config::create(
            &db,
            model_config::NewModelConfig {
                name: format!("workflow_model_{}", Uuid::new_v4()),
                api_base_url: "https://ark.example.com/api/v3".into(),
                api_key: "ak-workflow".into(),
                model: "seedream".into(),
                default_width: 512,
                default_height: 512,
            },
        )
        .await?;

        let t = task::create(
            &db,
            task::NewTask {
                prompt: "a cat in a garden".into(),
                width: 512,
                height: 512,
                style: None,
                user_id: Some(test_user.id),
                model_config_id: Some(mc.id),
            },
        )
        .await?;
        assert_eq!(t.status()?, task::TaskStatus::Pending);

        // Verify all entities exist and are properly linked
        let found = task::Entity::find_by_id(t.id).one(&db).await?;
        let found = found.expect("task exists");
        assert_eq!(found.user_id, Some(test_user.id));
        assert_eq!(found.model_config_id, Some(mc.id));

        // Cleanup
        task::Entity::delete_by_id(t.id).exec(&db).await?;
        api_key::Entity::delete_by_id(test_key.id).exec(&db).await?;
        model_config::Entity::delete_by_id(mc.id).exec(&db).await?;
        user::hard_delete(&db, test_user.id).await?;
        Ok(())
    }
}
