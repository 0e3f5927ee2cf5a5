//! Built-in component templates.

use compbridge_types::Template;

const TEMPLATES: &[Template] = &[
    Template {
        name: "Primary Button",
        category: "Button",
        description: "Button for a primary action",
        sample_data: Some(r#"{"text": "Send"}"#),
        code: r#"const PrimaryButton = ({ text }) => {
  return (
    <div style={{
      display: 'inline-block',
      padding: '10px 20px',
      backgroundColor: '#1e40af',
      color: 'white',
      borderRadius: '6px',
      fontSize: '14px',
      fontWeight: '500',
      cursor: 'pointer',
    }}>
      {text || 'Button'}
    </div>
  );
};"#,
    },
    Template {
        name: "Profile Card",
        category: "Card",
        description: "Card for a user profile",
        sample_data: Some(r#"{"name": "Jane Doe", "role": "Engineer", "avatar": "👩‍💻"}"#),
        code: r#"const ProfileCard = ({ name, role, avatar }) => {
  return (
    <div style={{
      maxWidth: '320px',
      padding: '24px',
      backgroundColor: 'white',
      borderRadius: '16px',
      boxShadow: '0 4px 12px rgba(0,0,0,0.1)',
      textAlign: 'center',
    }}>
      <div style={{
        width: '80px',
        height: '80px',
        backgroundColor: '#3b82f6',
        borderRadius: '50%',
        margin: '0 auto 16px',
        display: 'flex',
        alignItems: 'center',
        justifyContent: 'center',
        fontSize: '32px',
      }}>
        {avatar || '👤'}
      </div>
      <h3 style={{
        fontSize: '20px',
        fontWeight: 'bold',
        marginBottom: '8px',
        color: '#111827',
      }}>
        {name || 'Name'}
      </h3>
      <p style={{
        fontSize: '14px',
        color: '#6b7280',
      }}>
        {role || 'Role'}
      </p>
    </div>
  );
};"#,
    },
    Template {
        name: "Login Form",
        category: "Form",
        description: "Sign-in form",
        sample_data: None,
        code: r#"const LoginForm = () => {
  return (
    <div style={{
      maxWidth: '400px',
      padding: '32px',
      backgroundColor: 'white',
      borderRadius: '12px',
      boxShadow: '0 4px 12px rgba(0,0,0,0.1)',
    }}>
      <h2 style={{
        fontSize: '24px',
        fontWeight: 'bold',
        marginBottom: '24px',
        color: '#111827',
      }}>
        Sign in
      </h2>
      <input
        type="email"
        placeholder="Email address"
        style={{
          width: '100%',
          padding: '12px',
          marginBottom: '16px',
          border: '1px solid #d1d5db',
          borderRadius: '6px',
          fontSize: '14px',
        }}
      />
      <input
        type="password"
        placeholder="Password"
        style={{
          width: '100%',
          padding: '12px',
          marginBottom: '24px',
          border: '1px solid #d1d5db',
          borderRadius: '6px',
          fontSize: '14px',
        }}
      />
      <button style={{
        width: '100%',
        padding: '12px',
        backgroundColor: '#3b82f6',
        color: 'white',
        border: 'none',
        borderRadius: '6px',
        fontSize: '16px',
        fontWeight: '600',
        cursor: 'pointer',
      }}>
        Sign in
      </button>
    </div>
  );
};"#,
    },
    Template {
        name: "Tab Navigation",
        category: "Navigation",
        description: "Tabbed navigation bar",
        sample_data: Some(r#"{"tabs": ["Overview", "Details", "Reviews"]}"#),
        code: r#"const TabNavigation = ({ tabs = [] }) => {
  const tabList = tabs.length > 0 ? tabs : ['Tab 1', 'Tab 2', 'Tab 3'];
  const [activeTab, setActiveTab] = React.useState(tabList[0]);

  return (
    <div style={{
      borderBottom: '2px solid #e5e7eb',
      display: 'flex',
      gap: '32px',
    }}>
      {tabList.map((tab, i) => (
        <button
          key={i}
          onClick={() => setActiveTab(tab)}
          style={{
            padding: '12px 0',
            backgroundColor: 'transparent',
            border: 'none',
            borderBottom: tab === activeTab ? '2px solid #3b82f6' : '2px solid transparent',
            color: tab === activeTab ? '#3b82f6' : '#6b7280',
            fontWeight: tab === activeTab ? '600' : '400',
            fontSize: '14px',
            cursor: 'pointer',
            marginBottom: '-2px',
          }}
        >
          {tab}
        </button>
      ))}
    </div>
  );
};"#,
    },
];

/// All templates in catalog order.
pub fn list() -> &'static [Template] {
    TEMPLATES
}

/// Look a template up by name, ignoring case.
pub fn find(name: &str) -> Option<&'static Template> {
    TEMPLATES.iter().find(|t| t.name.eq_ignore_ascii_case(name.trim()))
}

/// Distinct categories in first-seen order.
pub fn categories() -> Vec<&'static str> {
    let mut seen = Vec::new();
    for template in TEMPLATES {
        if !seen.contains(&template.category) {
            seen.push(template.category);
        }
    }
    seen
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_contents() {
        let names: Vec<_> = list().iter().map(|t| t.name).collect();
        assert_eq!(
            names,
            ["Primary Button", "Profile Card", "Login Form", "Tab Navigation"]
        );
        assert_eq!(categories(), ["Button", "Card", "Form", "Navigation"]);
    }

    #[test]
    fn test_find_ignores_case() {
        assert_eq!(find("login form").map(|t| t.category), Some("Form"));
        assert!(find("Modal").is_none());
    }

    #[test]
    fn test_sample_data_is_json_object() {
        for template in list() {
            if let Some(data) = template.sample_data {
                let value: serde_json::Value = serde_json::from_str(data).unwrap();
                assert!(value.is_object(), "{}", template.name);
            }
        }
    }
}
