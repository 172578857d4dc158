use sea_orm_migration::prelude::*;

#[derive(DeriveIden)]
enum DiscountCodes {
    Table,
    Id,
    UserId,
    Code,
    CodeType,
    Uses,
    TotalUses,
    IsActive,
    Percentage,
    ExpiresAt,
    MintWindow,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum RewardRedemptions {
    Table,
    Id,
    DiscountCodeId,
    OrderId,
    CreatedAt,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(DiscountCodes::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(DiscountCodes::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(DiscountCodes::UserId).big_integer().not_null())
                    .col(ColumnDef::new(DiscountCodes::Code).string_len(32).not_null())
                    .col(
                        ColumnDef::new(DiscountCodes::CodeType)
                            .string_len(16)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(DiscountCodes::Uses)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(DiscountCodes::TotalUses)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(DiscountCodes::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(ColumnDef::new(DiscountCodes::Percentage).integer().null())
                    .col(
                        ColumnDef::new(DiscountCodes::ExpiresAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(ColumnDef::new(DiscountCodes::MintWindow).big_integer().null())
                    .col(
                        ColumnDef::new(DiscountCodes::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(DiscountCodes::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("uq_discount_codes_code")
                    .table(DiscountCodes::Table)
                    .col(DiscountCodes::Code)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // at most one reward code per (owner, type, UTC day); NULL windows never collide
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("uq_discount_codes_owner_type_window")
                    .table(DiscountCodes::Table)
                    .col(DiscountCodes::UserId)
                    .col(DiscountCodes::CodeType)
                    .col(DiscountCodes::MintWindow)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // at most one active personal code per owner (partial index, same syntax on postgres and sqlite)
        manager
            .get_connection()
            .execute_unprepared(
                "CREATE UNIQUE INDEX IF NOT EXISTS uq_discount_codes_active_personal \
                 ON discount_codes (user_id) WHERE code_type = 'personal' AND is_active",
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(RewardRedemptions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(RewardRedemptions::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(RewardRedemptions::DiscountCodeId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RewardRedemptions::OrderId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RewardRedemptions::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("uq_reward_redemptions_order")
                    .table(RewardRedemptions::Table)
                    .col(RewardRedemptions::OrderId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(
                Table::drop()
                    .if_exists()
                    .table(RewardRedemptions::Table)
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(
                Table::drop()
                    .if_exists()
                    .table(DiscountCodes::Table)
                    .to_owned(),
            )
            .await?;
        Ok(())
    }
}
