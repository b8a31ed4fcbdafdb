//! Groups, membership and shared habits

use rand::Rng;
use rand::distributions::Alphanumeric;
use std::collections::{BTreeSet, HashMap};
use std::future::Future;
use tracing::{debug, info};
use uuid::Uuid;

use crate::calendar::DayRange;
use crate::error::{TrackerError, TrackerResult};
use crate::models::{Group, NewGroup, UpdateGroup};
use crate::service::{Tracker, bounded_text};
use crate::stats::{HabitStats, MemberStats, rank_members};

const MAX_NAME_LEN: usize = 100;
const MAX_DESCRIPTION_LEN: usize = 500;
const DEFAULT_MAX_MEMBERS: u32 = 50;
const MIN_MEMBERS: u32 = 2;
const MAX_MEMBERS: u32 = 1000;
const INVITE_CODE_LEN: usize = 8;
const INVITE_CODE_ATTEMPTS: u32 = 3;

/// Eight uppercase letters and digits
pub fn generate_invite_code() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(INVITE_CODE_LEN)
        .map(|b| char::from(b).to_ascii_uppercase())
        .collect()
}

fn check_capacity(max_members: u32) -> TrackerResult<u32> {
    if !(MIN_MEMBERS..=MAX_MEMBERS).contains(&max_members) {
        return Err(TrackerError::validation(format!(
            "max_members must be between {} and {}",
            MIN_MEMBERS, MAX_MEMBERS
        )));
    }
    Ok(max_members)
}

/// Store the group, minting another invite code while the current one is taken
async fn persist_with_fresh_code<F, Fut>(group: &mut Group, mut persist: F) -> TrackerResult<()>
where
    F: FnMut(Group) -> Fut,
    Fut: Future<Output = TrackerResult<()>>,
{
    let mut attempt = 1;
    loop {
        match persist(group.clone()).await {
            Err(TrackerError::Conflict(reason))
                if group.invite_code.is_some() && attempt < INVITE_CODE_ATTEMPTS =>
            {
                debug!(group_id = %group.id, %reason, "Invite code taken, minting another");
                attempt += 1;
                group.invite_code = Some(generate_invite_code());
            }
            result => return result,
        }
    }
}

impl Tracker {
    pub async fn create_group(&self, actor: Uuid, new: NewGroup) -> TrackerResult<Group> {
        let now = self.now();
        let mut group = Group {
            id: Uuid::new_v4(),
            name: bounded_text("name", &new.name, 1, MAX_NAME_LEN)?,
            description: bounded_text("description", &new.description, 0, MAX_DESCRIPTION_LEN)?,
            creator_id: actor,
            members: BTreeSet::from([actor]),
            habits: BTreeSet::new(),
            is_private: new.is_private,
            max_members: check_capacity(new.max_members.unwrap_or(DEFAULT_MAX_MEMBERS))?,
            invite_code: (!new.is_private).then(generate_invite_code),
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        persist_with_fresh_code(&mut group, move |g| async move { self.store().insert_group(&g).await })
            .await?;
        info!(group_id = %group.id, creator_id = %actor, "Group created");
        Ok(group)
    }

    /// Members see any group; everyone else only public ones
    pub async fn get_group(&self, actor: Uuid, id: Uuid) -> TrackerResult<Group> {
        let group = self.load_group(id).await?;
        if group.is_private && !group.is_member(actor) {
            return Err(TrackerError::not_found("group", id));
        }
        Ok(group)
    }

    pub async fn list_groups(&self, actor: Uuid) -> TrackerResult<Vec<Group>> {
        self.store().list_groups_for_member(actor).await
    }

    pub async fn list_public_groups(&self) -> TrackerResult<Vec<Group>> {
        self.store().list_public_groups().await
    }

    /// Creator only. Going private drops the invite code, going public mints one.
    pub async fn update_group(&self, actor: Uuid, id: Uuid, update: UpdateGroup) -> TrackerResult<Group> {
        let mut group = self.owned_group(actor, id).await?;

        if let Some(name) = update.name {
            group.name = bounded_text("name", &name, 1, MAX_NAME_LEN)?;
        }
        if let Some(description) = update.description {
            group.description = bounded_text("description", &description, 0, MAX_DESCRIPTION_LEN)?;
        }
        if let Some(max_members) = update.max_members {
            let max_members = check_capacity(max_members)?;
            if max_members < group.member_count() {
                return Err(TrackerError::validation(format!(
                    "max_members cannot be below the current {} members",
                    group.member_count()
                )));
            }
            group.max_members = max_members;
        }
        let mut minted = false;
        if let Some(is_private) = update.is_private {
            if is_private != group.is_private {
                group.is_private = is_private;
                group.invite_code = (!is_private).then(generate_invite_code);
                minted = !is_private;
            }
        }
        group.updated_at = self.now();

        if minted {
            persist_with_fresh_code(&mut group, move |g| async move { self.store().update_group(&g).await })
                .await?;
        } else {
            self.store().update_group(&group).await?;
        }
        info!(group_id = %group.id, "Group updated");
        Ok(group)
    }

    /// Soft delete
    pub async fn delete_group(&self, actor: Uuid, id: Uuid) -> TrackerResult<()> {
        let mut group = self.owned_group(actor, id).await?;
        group.is_active = false;
        group.updated_at = self.now();
        self.store().update_group(&group).await?;
        info!(group_id = %group.id, "Group deactivated");
        Ok(())
    }

    pub async fn join_group(&self, actor: Uuid, id: Uuid) -> TrackerResult<Group> {
        let group = self.load_group(id).await?;
        self.join(actor, group).await
    }

    pub async fn join_group_by_code(&self, actor: Uuid, code: &str) -> TrackerResult<Group> {
        let code = code.trim().to_ascii_uppercase();
        let group = self
            .store()
            .find_group_by_invite_code(&code)
            .await?
            .filter(|g| g.is_active)
            .ok_or_else(|| TrackerError::validation("invite code is not valid"))?;
        self.join(actor, group).await
    }

    /// Private groups stay hidden from outsiders, as in `get_group`
    async fn join(&self, actor: Uuid, group: Group) -> TrackerResult<Group> {
        if group.is_private && !group.is_member(actor) {
            return Err(TrackerError::not_found("group", group.id));
        }
        self.store().add_member(group.id, actor).await?;
        info!(group_id = %group.id, user_id = %actor, "Joined group");
        self.load_group(group.id).await
    }

    pub async fn leave_group(&self, actor: Uuid, id: Uuid) -> TrackerResult<()> {
        let group = self.load_group(id).await?;
        if group.creator_id == actor {
            return Err(TrackerError::validation("the creator cannot leave their own group"));
        }
        if !self.store().remove_member(id, actor).await? {
            return Err(TrackerError::not_found("membership", id));
        }
        info!(group_id = %id, user_id = %actor, "Left group");
        Ok(())
    }

    /// Creator invites a user directly; the only way into a private group
    pub async fn add_member(&self, actor: Uuid, id: Uuid, user_id: Uuid) -> TrackerResult<Group> {
        let group = self.owned_group(actor, id).await?;
        if self.store().find_user(user_id).await?.is_none() {
            return Err(TrackerError::not_found("user", user_id));
        }
        self.store().add_member(group.id, user_id).await?;
        info!(group_id = %id, %user_id, "Member added");
        self.load_group(id).await
    }

    pub async fn remove_member(&self, actor: Uuid, id: Uuid, user_id: Uuid) -> TrackerResult<Group> {
        let group = self.owned_group(actor, id).await?;
        if user_id == group.creator_id {
            return Err(TrackerError::validation("the creator cannot be removed"));
        }
        if !self.store().remove_member(id, user_id).await? {
            return Err(TrackerError::not_found("membership", user_id));
        }
        info!(group_id = %id, %user_id, "Member removed");
        self.load_group(id).await
    }

    /// Members share habits they created
    pub async fn share_habit(&self, actor: Uuid, group_id: Uuid, habit_id: Uuid) -> TrackerResult<Group> {
        let group = self.load_group(group_id).await?;
        if !group.is_member(actor) {
            return Err(TrackerError::forbidden("only members can share habits with a group"));
        }

        let habit = self.load_habit(habit_id).await?;
        if habit.creator_id != actor {
            return Err(TrackerError::forbidden("only the habit's creator can share it"));
        }
        if !habit.is_active {
            return Err(TrackerError::validation("habit has been deleted"));
        }

        self.store().add_group_habit(group_id, habit_id).await?;
        info!(%group_id, %habit_id, "Habit shared");
        self.load_group(group_id).await
    }

    /// The habit's creator or the group's creator may unshare
    pub async fn unshare_habit(&self, actor: Uuid, group_id: Uuid, habit_id: Uuid) -> TrackerResult<Group> {
        let group = self.load_group(group_id).await?;
        let habit = self.load_habit(habit_id).await?;
        if habit.creator_id != actor && group.creator_id != actor {
            return Err(TrackerError::forbidden(
                "only the habit's creator or the group's creator can unshare it",
            ));
        }
        if !self.store().remove_group_habit(group_id, habit_id).await? {
            return Err(TrackerError::not_found("shared habit", habit_id));
        }
        info!(%group_id, %habit_id, "Habit unshared");
        self.load_group(group_id).await
    }

    /// Every member's stats over the group's active habits, best first
    pub async fn group_leaderboard(&self, actor: Uuid, group_id: Uuid) -> TrackerResult<Vec<MemberStats>> {
        let group = self.load_group(group_id).await?;
        if !group.is_member(actor) {
            return Err(TrackerError::forbidden("only members can see the leaderboard"));
        }

        let habit_ids: Vec<Uuid> = group.habits.iter().copied().collect();
        let habits: Vec<_> = self
            .store()
            .list_habits_by_ids(&habit_ids)
            .await?
            .into_iter()
            .filter(|h| h.is_active)
            .collect();
        let entries = self
            .store()
            .list_entries_for_habits(&habit_ids, DayRange::all())
            .await?;

        let member_ids: Vec<Uuid> = group.members.iter().copied().collect();
        let usernames: HashMap<Uuid, String> = self
            .store()
            .find_users(&member_ids)
            .await?
            .into_iter()
            .map(|u| (u.id, u.username))
            .collect();

        let today = self.today();
        let mut board: Vec<MemberStats> = member_ids
            .iter()
            .map(|&member| {
                let stats = habits
                    .iter()
                    .map(|habit| HabitStats::compute(habit, member, &entries, today))
                    .collect();
                let username = usernames.get(&member).cloned().unwrap_or_default();
                MemberStats::new(member, username, stats)
            })
            .collect();

        rank_members(&mut board);
        Ok(board)
    }

    async fn owned_group(&self, actor: Uuid, id: Uuid) -> TrackerResult<Group> {
        let group = self.get_group(actor, id).await?;
        if group.creator_id != actor {
            return Err(TrackerError::forbidden("only the creator can manage this group"));
        }
        Ok(group)
    }
}
