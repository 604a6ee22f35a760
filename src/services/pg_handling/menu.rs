use actix::Handler;
use diesel::prelude::*;
use tracing::info;

use crate::error::{ServiceError, ServiceResult};
use crate::schema::{employees, menu_items, users};
use crate::services::db_models::MenuItem;
use crate::services::db_utils::PgActor;
use crate::services::insertable::NewMenuItem;
use crate::services::messages::{CreateMenuItem, DeleteMenuItem, FetchChefMenu, FetchMenu, UpdateMenuItem};
use crate::services::views::{ChefMenuItem, MenuEntry};
use crate::types::EmployeeType;

use super::load_employee;

/// Loads a dish and checks that it belongs to the calling chef.
fn own_item(conn: &mut PgConnection, chef_user_id: i64, item_id: i64) -> ServiceResult<MenuItem> {
    let chef = load_employee(conn, chef_user_id, EmployeeType::Chef)?;

    let item = menu_items::table
        .find(item_id)
        .select(MenuItem::as_select())
        .first(conn)
        .optional()?
        .filter(|item| item.is_available)
        .ok_or_else(|| ServiceError::not_found("Menu item not found"))?;

    if item.chef_id != chef.id {
        return Err(ServiceError::forbidden("You can only manage your own dishes"));
    }

    Ok(item)
}

fn validate_dish(name: &str, price: i64) -> ServiceResult<()> {
    if name.trim().is_empty() {
        return Err(ServiceError::bad_request("Dish name is required"));
    }
    if price <= 0 {
        return Err(ServiceError::bad_request("Price must be positive"));
    }
    Ok(())
}

impl Handler<FetchMenu> for PgActor {
    type Result = ServiceResult<Vec<MenuEntry>>;

    fn handle(&mut self, _msg: FetchMenu, _ctx: &mut Self::Context) -> Self::Result {
        let mut conn = self.connection()?;

        let rows = menu_items::table
            .inner_join(employees::table.inner_join(users::table))
            .filter(menu_items::is_available.eq(true))
            .filter(employees::is_active.eq(true))
            .order(menu_items::name.asc())
            .select((MenuItem::as_select(), users::username))
            .load::<(MenuItem, String)>(&mut conn)?;

        Ok(rows
            .iter()
            .map(|(item, chef_name)| MenuEntry::new(item, chef_name))
            .collect())
    }
}

impl Handler<FetchChefMenu> for PgActor {
    type Result = ServiceResult<Vec<ChefMenuItem>>;

    fn handle(&mut self, msg: FetchChefMenu, _ctx: &mut Self::Context) -> Self::Result {
        let mut conn = self.connection()?;
        let chef = load_employee(&mut conn, msg.0, EmployeeType::Chef)?;

        let items = menu_items::table
            .filter(menu_items::chef_id.eq(chef.id))
            .filter(menu_items::is_available.eq(true))
            .order(menu_items::created_at.desc())
            .select(MenuItem::as_select())
            .load::<MenuItem>(&mut conn)?;

        Ok(items
            .into_iter()
            .map(|item| ChefMenuItem {
                average_rating: item.average_rating(),
                item,
            })
            .collect())
    }
}

impl Handler<CreateMenuItem> for PgActor {
    type Result = ServiceResult<MenuItem>;

    fn handle(&mut self, msg: CreateMenuItem, _ctx: &mut Self::Context) -> Self::Result {
        validate_dish(&msg.name, msg.price)?;

        let mut conn = self.connection()?;
        let chef = load_employee(&mut conn, msg.chef_user_id, EmployeeType::Chef)?;

        let item = diesel::insert_into(menu_items::table)
            .values(NewMenuItem {
                chef_id: chef.id,
                name: msg.name.trim().to_owned(),
                description: msg.description,
                price: msg.price,
                image_url: msg.image_url,
                is_vip_exclusive: msg.is_vip_exclusive,
            })
            .get_result::<MenuItem>(&mut conn)?;

        info!(chef_id = chef.id, item_id = item.id, "Menu item created");
        Ok(item)
    }
}

impl Handler<UpdateMenuItem> for PgActor {
    type Result = ServiceResult<MenuItem>;

    fn handle(&mut self, msg: UpdateMenuItem, _ctx: &mut Self::Context) -> Self::Result {
        let mut conn = self.connection()?;
        let mut item = own_item(&mut conn, msg.chef_user_id, msg.item_id)?;

        if let Some(name) = msg.name {
            item.name = name.trim().to_owned();
        }
        if let Some(description) = msg.description {
            item.description = description;
        }
        if let Some(price) = msg.price {
            item.price = price;
        }
        if msg.image_url.is_some() {
            item.image_url = msg.image_url;
        }
        if let Some(vip) = msg.is_vip_exclusive {
            item.is_vip_exclusive = vip;
        }
        validate_dish(&item.name, item.price)?;

        let item = diesel::update(menu_items::table.find(item.id))
            .set((
                menu_items::name.eq(&item.name),
                menu_items::description.eq(&item.description),
                menu_items::price.eq(item.price),
                menu_items::image_url.eq(&item.image_url),
                menu_items::is_vip_exclusive.eq(item.is_vip_exclusive),
            ))
            .get_result::<MenuItem>(&mut conn)?;

        info!(item_id = item.id, "Menu item updated");
        Ok(item)
    }
}

impl Handler<DeleteMenuItem> for PgActor {
    type Result = ServiceResult<()>;

    fn handle(&mut self, msg: DeleteMenuItem, _ctx: &mut Self::Context) -> Self::Result {
        let mut conn = self.connection()?;
        let item = own_item(&mut conn, msg.chef_user_id, msg.item_id)?;

        // Past orders keep pointing at the row, so it is only hidden.
        diesel::update(menu_items::table.find(item.id))
            .set(menu_items::is_available.eq(false))
            .execute(&mut conn)?;

        info!(item_id = item.id, "Menu item removed");
        Ok(())
    }
}
