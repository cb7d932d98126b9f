use super::common::*;

use crate::directory::domain::{ChannelCategory, ChannelId, ExpertiseCategory, ExpertiseId};
use crate::directory::validation::{
    ChannelEdit, ChannelForm, ExpertiseEdit, ExpertiseForm, FormErrors, MembershipForm,
    OrganizationForm, UserProfileForm,
};

fn organization_form() -> OrganizationForm {
    OrganizationForm::from_organization(&sample_organization(3, true))
}

#[test]
fn organization_form_round_trips_current_values() {
    let base = sample_organization(3, true);
    let mut errors = FormErrors::default();

    let cleaned = organization_form().clean(&base, &mut errors);

    assert!(errors.is_empty(), "{errors}");
    assert_eq!(cleaned, Some(base));
}

#[test]
fn organization_form_rejects_non_web_urls_and_long_names() {
    let mut form = organization_form();
    form.website = "ftp://example.org/files".to_string();
    form.name = "x".repeat(101);
    let mut errors = FormErrors::default();

    assert!(form
        .clean(&sample_organization(3, true), &mut errors)
        .is_none());
    assert_eq!(
        errors.get("org-website"),
        Some(&["Enter a valid URL.".to_string()][..])
    );
    assert!(errors.contains("org-name"));
}

#[test]
fn organization_form_rejects_negative_ages_and_bad_twitter_names() {
    let mut form = organization_form();
    form.min_youth_audience_age = Some(-1);
    form.twitter_name = "not a handle".to_string();
    let mut errors = FormErrors::default();

    assert!(form
        .clean(&sample_organization(3, true), &mut errors)
        .is_none());
    assert!(errors.contains("org-min_youth_audience_age"));
    assert!(errors.contains("org-twitter_name"));
    assert!(!errors.contains("org-__all__"));
}

#[test]
fn channel_forms_produce_creates_updates_and_deletes() {
    let mut errors = FormErrors::default();

    let create = ChannelForm {
        category: "vimeo".to_string(),
        url: "https://vimeo.com/hive".to_string(),
        ..ChannelForm::default()
    };
    let update = ChannelForm {
        id: Some(ChannelId(4)),
        category: "other".to_string(),
        name: "Blog".to_string(),
        url: "https://blog.example.org/".to_string(),
        delete: false,
    };
    let delete = ChannelForm {
        id: Some(ChannelId(5)),
        url: "garbage".to_string(),
        delete: true,
        ..ChannelForm::default()
    };

    assert!(matches!(
        create.clean(0, &mut errors),
        Some(ChannelEdit::Create {
            category: ChannelCategory::Vimeo,
            ..
        })
    ));
    assert!(matches!(
        update.clean(1, &mut errors),
        Some(ChannelEdit::Update { id: ChannelId(4), ref name, .. }) if name == "Blog"
    ));
    assert_eq!(delete.clean(2, &mut errors), Some(ChannelEdit::Delete(ChannelId(5))));
    assert_eq!(ChannelForm::default().clean(3, &mut errors), None);
    assert!(errors.is_empty(), "{errors}");
}

#[test]
fn channel_form_errors_are_prefixed_by_position() {
    let mut errors = FormErrors::default();
    let form = ChannelForm {
        category: "friendster".to_string(),
        ..ChannelForm::default()
    };

    assert_eq!(form.clean(2, &mut errors), None);
    assert!(errors.contains("chan-2-category"));
    assert_eq!(
        errors.get("chan-2-url"),
        Some(&["This field is required.".to_string()][..])
    );
}

#[test]
fn usernames_are_restricted_to_word_characters_and_punctuation() {
    let base = sample_user(true, false);

    for (username, valid) in [
        ("rita.r+hive@nyc", true),
        ("rita radiotelli", false),
        ("", false),
        ("abcdefghijklmnopqrstuvwxyzabcde", false),
    ] {
        let form = UserProfileForm {
            username: username.to_string(),
            ..UserProfileForm::from_user(&base)
        };
        let mut errors = FormErrors::default();
        assert_eq!(
            form.clean(&base, &mut errors).is_some(),
            valid,
            "{username:?}"
        );
        assert_eq!(errors.contains("user_profile-username"), !valid);
    }
}

#[test]
fn membership_form_normalizes_contact_fields() {
    let base = sample_membership(None);
    let form = MembershipForm {
        title: "Director".to_string(),
        twitter_name: "@hive_nyc".to_string(),
        phone_number: "+1 (212) 555-0100".to_string(),
        receives_minigroup_digest: true,
        is_listed: false,
    };
    let mut errors = FormErrors::default();

    let cleaned = form.clean(&base, &mut errors).expect("valid");

    assert_eq!(cleaned.id, base.id);
    assert_eq!(cleaned.twitter_name.map(String::from).as_deref(), Some("hive_nyc"));
    assert_eq!(
        cleaned.phone_number.as_ref().map(|phone| phone.as_str()),
        Some("212-555-0100")
    );
    assert!(!cleaned.is_listed);
}

#[test]
fn expertise_forms_validate_category_choices() {
    let mut errors = FormErrors::default();
    let valid = ExpertiseForm {
        id: Some(ExpertiseId(9)),
        category: "curriculum".to_string(),
        details: "Maker ed".to_string(),
        delete: false,
    };
    let invalid = ExpertiseForm {
        category: "juggling".to_string(),
        details: "d".repeat(256),
        ..ExpertiseForm::default()
    };

    assert!(matches!(
        valid.clean(0, &mut errors),
        Some(ExpertiseEdit::Update {
            category: ExpertiseCategory::Curriculum,
            ..
        })
    ));
    assert_eq!(invalid.clean(1, &mut errors), None);
    assert!(errors.contains("expertise-1-category"));
    assert!(errors.contains("expertise-1-details"));
    assert_eq!(errors.len(), 2);
}
