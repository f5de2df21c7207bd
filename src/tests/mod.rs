mod unit_json_mirror;
mod unit_models_posts;
mod unit_sqlite_posts_database;
